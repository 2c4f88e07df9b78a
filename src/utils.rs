//! Utility functions and helpers

use crate::error::{Result, TabJarError};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// URL validation and parsing utilities
pub struct UrlUtils;

impl UrlUtils {
    /// Validate and normalize URL
    pub fn validate_url(input: &str) -> Result<Url> {
        // Add http:// if no scheme is provided
        let url_str = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{}", input)
        };

        let url = Url::parse(&url_str)
            .map_err(|e| TabJarError::InvalidUrl(format!("Invalid URL '{}': {}", input, e)))?;
        if url.host_str().is_none() {
            return Err(TabJarError::InvalidUrl(format!(
                "URL '{}' has no host",
                input
            )));
        }
        Ok(url)
    }
}

/// File system utilities
pub struct FileUtils;

impl FileUtils {
    /// Expand tilde (~) in file paths
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(rest) = path.strip_prefix('~') {
            let home_dir = dirs::home_dir().ok_or_else(|| {
                TabJarError::Config("Cannot determine home directory".to_string())
            })?;
            Ok(home_dir.join(rest.trim_start_matches('/')))
        } else {
            Ok(PathBuf::from(path))
        }
    }

    /// Check if file exists and is a regular file
    pub fn check_file_readable(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(TabJarError::FileNotFound(format!(
                "File not found: {:?}",
                path
            )));
        }

        if !path.is_file() {
            return Err(TabJarError::Config(format!("Path is not a file: {:?}", path)));
        }

        Ok(())
    }
}

/// String utilities
pub struct StringUtils;

impl StringUtils {
    /// Parse `key: value` header lines
    pub fn parse_header(input: &str) -> Result<(String, String)> {
        match input.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(TabJarError::InvalidHeader(format!(
                "Invalid header format: '{}'. Expected 'key: value'",
                input
            ))),
        }
    }
}
