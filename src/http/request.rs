//! Outgoing request model

use url::Url;

use crate::config::HeaderMerge;
use crate::cookies::{cookie_header, RequestCookieMap};
use crate::error::Result;
use crate::tabs::TabId;
use crate::utils::UrlUtils;

/// A request a tab is about to send, as seen by the pre-send-headers hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub tab_id: TabId,
    pub method: String,
    pub url: Url,
    /// Header order is kept; names compare case-insensitively.
    pub headers: Vec<(String, String)>,
}

impl OutgoingRequest {
    pub fn new(tab_id: TabId, method: &str, url: &str) -> Result<Self> {
        Ok(Self {
            tab_id,
            method: method.to_uppercase(),
            url: UrlUtils::validate_url(url)?,
            headers: Vec::new(),
        })
    }

    pub fn get(tab_id: TabId, url: &str) -> Result<Self> {
        Self::new(tab_id, "GET", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Install the isolated cookies as this request's `Cookie` header.
    pub fn merge_cookies(&mut self, cookies: &RequestCookieMap, mode: HeaderMerge) {
        let existing = self.header("cookie").map(str::to_string);
        self.headers
            .retain(|(key, _)| !key.eq_ignore_ascii_case("cookie"));

        let isolated = cookie_header(cookies);
        let value = match (mode, existing, isolated) {
            (HeaderMerge::Append, Some(existing), Some(isolated)) => {
                Some(format!("{}; {}", existing, isolated))
            }
            (HeaderMerge::Append, Some(existing), None) => Some(existing),
            (_, _, isolated) => isolated,
        };

        if let Some(value) = value {
            self.headers.push(("Cookie".to_string(), value));
        }
    }
}
