//! HTTP client module
//!
//! Sends requests after the pre-send-headers hook has installed the tab's
//! isolated cookie header.

use crate::config::Config;
use crate::error::{Result, TabJarError};
use reqwest::{Client, ClientBuilder, Method};

pub mod request;
pub mod response;

use request::OutgoingRequest;
use response::ResponseSummary;

/// HTTP client wrapper
pub struct HttpClient {
    client: Client,
    user_agent: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            // Redirects would resend the isolated cookies to another origin.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(TabJarError::Http)?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Execute a prepared request
    pub async fn execute(&self, outgoing: &OutgoingRequest) -> Result<ResponseSummary> {
        let method = Method::from_bytes(outgoing.method.as_bytes()).map_err(|e| {
            TabJarError::Config(format!("Unknown HTTP method '{}': {}", outgoing.method, e))
        })?;

        let mut request = self.client.request(method, outgoing.url.clone());

        for (key, value) in &outgoing.headers {
            request = request.header(key, value);
        }

        if outgoing.header("user-agent").is_none() {
            if let Some(user_agent) = &self.user_agent {
                request = request.header("User-Agent", user_agent);
            }
        }

        let request = request.build().map_err(TabJarError::Http)?;
        log::debug!(
            "> {} {} (tab {})",
            request.method(),
            request.url(),
            outgoing.tab_id
        );

        let response = self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                TabJarError::Timeout
            } else {
                TabJarError::Http(e)
            }
        })?;
        ResponseSummary::read(response).await
    }
}
