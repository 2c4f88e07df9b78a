//! Configuration management for tabjar

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// What to do when a propagated cookie already exists in the destination
/// store under the same name, domain and path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Upsert, the host store's native `set` semantics.
    #[default]
    Overwrite,
    /// Keep the existing cookie untouched.
    Skip,
}

impl FromStr for ConflictPolicy {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" | "upsert" => Ok(ConflictPolicy::Overwrite),
            "skip" | "keep" => Ok(ConflictPolicy::Skip),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = match self {
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Skip => "skip",
        };
        write!(f, "{}", policy)
    }
}

/// How the isolated cookie header is merged into an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMerge {
    /// Drop any existing `Cookie` header.
    #[default]
    Replace,
    /// Keep an existing `Cookie` header and append the isolated cookies.
    Append,
}

impl FromStr for HeaderMerge {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(HeaderMerge::Replace),
            "append" | "merge" => Ok(HeaderMerge::Append),
            _ => Err(()),
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub conflict_policy: ConflictPolicy,
    pub header_merge: HeaderMerge,
    /// Tabs created with the same container name share one cookie store.
    pub group_by_container: bool,
    /// Upper bound on in-flight store lookups for one request.
    pub lookup_concurrency: usize,
    #[serde(deserialize_with = "duration_from_secs")]
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            conflict_policy: ConflictPolicy::Overwrite,
            header_merge: HeaderMerge::Replace,
            group_by_container: false,
            lookup_concurrency: 16,
            timeout: Duration::from_secs(30),
            user_agent: Some(format!("tabjar/{}", crate::VERSION)),
        }
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}
