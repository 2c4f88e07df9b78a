//! Error handling for tabjar

use thiserror::Error;

use crate::tabs::TabId;

/// Main error type for tabjar operations
#[derive(Error, Debug)]
pub enum TabJarError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cookie rejected by store: {0}")]
    CookieRejected(String),

    #[error("Unknown tab: {0}")]
    UnknownTab(TabId),

    #[error("Tab {0} has no cookie store assigned")]
    TabNotIsolated(TabId),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network timeout")]
    Timeout,

    #[error("File not found: {0}")]
    FileNotFound(String),
}

/// Result type alias for tabjar operations
pub type Result<T> = std::result::Result<T, TabJarError>;
