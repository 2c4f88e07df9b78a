//! Cookie model and the host cookie store interface
//!
//! The extension never owns cookie storage. Everything it does goes through
//! the [`CookieStore`] trait, which mirrors the host's `get`/`set` calls with
//! an explicit isolation scope on every cookie.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::Result;
use crate::tabs::IsolationId;

pub mod memory;

pub use memory::MemoryCookieStore;

/// SameSite attribute, using the host API's value names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    #[default]
    Unspecified,
    NoRestriction,
    Lax,
    Strict,
}

/// A cookie as the host cookie store sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; `None` for a session cookie. The host reports fractional
    /// seconds, which are truncated.
    #[serde(
        default,
        deserialize_with = "expiration_from_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<i64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub host_only: bool,
    #[serde(default)]
    pub same_site: SameSite,
    /// URL the cookie is set against. Derived from domain and path when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Isolation scope the cookie belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<IsolationId>,
}

fn default_path() -> String {
    "/".to_string()
}

fn expiration_from_secs<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<f64>::deserialize(deserializer)?;
    Ok(secs.map(|secs| secs.trunc() as i64))
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expiration_date: None,
            secure: false,
            http_only: false,
            host_only: false,
            same_site: SameSite::Unspecified,
            url: None,
            store_id: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_expiration(mut self, unix_seconds: i64) -> Self {
        self.expiration_date = Some(unix_seconds);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Copy of this cookie with every public attribute kept and the scope
    /// replaced by `store_id`.
    pub fn scoped_to(&self, store_id: IsolationId) -> Cookie {
        Cookie {
            store_id: Some(store_id),
            ..self.clone()
        }
    }

    /// The URL used when handing the cookie to the store.
    pub fn set_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => {
                let scheme = if self.secure { "https" } else { "http" };
                let host = self.domain.trim_start_matches('.');
                format!("{}://{}{}", scheme, host, self.path)
            }
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expiration_date.is_some_and(|expiry| expiry <= now)
    }

    /// Whether `other` occupies the same slot (name, domain, path).
    pub fn same_key(&self, other: &Cookie) -> bool {
        self.name == other.name
            && self.path == other.path
            && self
                .domain
                .trim_start_matches('.')
                .eq_ignore_ascii_case(other.domain.trim_start_matches('.'))
    }
}

/// A single-cookie lookup: by name, applicable to `url`, inside one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieQuery {
    pub name: String,
    pub url: Url,
    pub store_id: IsolationId,
}

/// Host cookie store.
///
/// Every call is a potential suspension point. Implementations must keep
/// scopes disjoint: a cookie written with one `store_id` is never returned
/// for a query with another.
pub trait CookieStore: Send + Sync {
    /// Look up one cookie. A miss is `Ok(None)`.
    fn get(&self, query: &CookieQuery) -> impl Future<Output = Result<Option<Cookie>>> + Send;

    /// Upsert a cookie into the scope named by `cookie.store_id`.
    fn set(&self, cookie: Cookie) -> impl Future<Output = Result<()>> + Send;

    /// Whether the scope already holds a cookie with the same name, domain and path.
    fn contains(&self, cookie: &Cookie) -> impl Future<Output = Result<bool>> + Send;

    /// Drop every cookie in a scope, returning how many were removed.
    fn remove_store(&self, store_id: IsolationId) -> impl Future<Output = Result<usize>> + Send;
}

/// Per-request cookie mapping, name to value.
pub type RequestCookieMap = BTreeMap<String, String>;

/// Serialize a request cookie mapping into a `Cookie` header value.
pub fn cookie_header(cookies: &RequestCookieMap) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
