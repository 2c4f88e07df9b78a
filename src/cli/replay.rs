//! Replay a recorded sequence of host events

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::cookies::{cookie_header, MemoryCookieStore};
use crate::error::Result;
use crate::extension::{EventOutcome, Extension, HostEvent};
use crate::http::response::ResponseSummary;
use crate::http::HttpClient;
use crate::output::OutputWriter;
use crate::tabs::TabId;
use crate::utils::FileUtils;

/// A JSON event script.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub config: Option<Config>,
    pub events: Vec<HostEvent>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self> {
        FileUtils::check_file_readable(path)?;
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// One output line per request event.
#[derive(Debug, Clone, Serialize)]
pub struct RequestReport {
    pub tab: TabId,
    pub method: String,
    pub url: String,
    pub cookies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSummary>,
    /// Why sending failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Drive every event of `script` through a fresh extension.
///
/// Per-event failures are logged and replay continues. Requests are only
/// sent over the network when `send` is set; a failed send is recorded on
/// that request's report line.
pub async fn replay(
    script: ReplayScript,
    config: Config,
    send: bool,
    output: &mut OutputWriter,
) -> Result<usize> {
    let client = if send {
        Some(HttpClient::new(&config)?)
    } else {
        None
    };
    let extension = Extension::new(MemoryCookieStore::new(), config);

    let mut requests = 0;
    for (index, event) in script.events.into_iter().enumerate() {
        let outcome = match extension.dispatch(event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("Event #{} failed: {}", index, err);
                continue;
            }
        };

        let EventOutcome::Request { request, cookies } = outcome else {
            continue;
        };

        requests += 1;
        let (response, error) = match &client {
            Some(client) => match client.execute(&request).await {
                Ok(response) => (Some(response), None),
                Err(err) => {
                    log::warn!("Sending request #{} to {} failed: {}", index, request.url, err);
                    (None, Some(err.to_string()))
                }
            },
            None => (None, None),
        };
        output.write_line(&RequestReport {
            tab: request.tab_id,
            method: request.method.clone(),
            url: request.url.to_string(),
            header: cookie_header(&cookies),
            cookies,
            response,
            error,
        })?;
    }

    Ok(requests)
}
