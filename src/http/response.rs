//! HTTP response handling

use crate::error::{Result, TabJarError};
use serde::Serialize;

/// The parts of a response reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseSummary {
    pub status: u16,
    /// Names of cookies the server tried to set; they are not stored.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub set_cookie: Vec<String>,
    pub body_bytes: usize,
}

impl ResponseSummary {
    pub async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let set_cookie = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(set_cookie_name)
            .collect();
        let body = response.bytes().await.map_err(TabJarError::Http)?;

        Ok(Self {
            status,
            set_cookie,
            body_bytes: body.len(),
        })
    }
}

fn set_cookie_name(header: &str) -> Option<String> {
    let pair = header.split(';').next()?;
    let (name, _) = pair.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
