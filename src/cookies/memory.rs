//! In-process cookie store with the host's scoping and validation rules

use std::collections::HashMap;

use tokio::sync::RwLock;
use url::{Host, Url};

use super::{Cookie, CookieQuery, CookieStore};
use crate::error::{Result, TabJarError};
use crate::tabs::IsolationId;
use crate::utils::unix_now;

/// Cookie jar partitioned by isolation scope.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    scopes: RwLock<HashMap<IsolationId, Vec<Cookie>>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every cookie in a scope.
    pub async fn cookies_in(&self, store_id: IsolationId) -> Vec<Cookie> {
        self.scopes
            .read()
            .await
            .get(&store_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn scope_count(&self) -> usize {
        self.scopes.read().await.len()
    }

    pub async fn total_cookie_count(&self) -> usize {
        self.scopes.read().await.values().map(Vec::len).sum()
    }
}

impl CookieStore for MemoryCookieStore {
    async fn get(&self, query: &CookieQuery) -> Result<Option<Cookie>> {
        let Some(host) = query.url.host_str() else {
            return Ok(None);
        };
        let secure_channel = query.url.scheme() == "https";
        let ip_host = is_ip_host(&query.url);
        let now = unix_now();

        let scopes = self.scopes.read().await;
        let Some(cookies) = scopes.get(&query.store_id) else {
            return Ok(None);
        };

        // Longest path wins, like the host's ordering of matches.
        let found = cookies
            .iter()
            .filter(|c| c.name == query.name)
            .filter(|c| domain_matches(&c.domain, host, c.host_only || ip_host))
            .filter(|c| path_matches(&c.path, query.url.path()))
            .filter(|c| !c.secure || secure_channel)
            .filter(|c| !c.is_expired(now))
            .max_by_key(|c| c.path.len())
            .cloned();
        Ok(found)
    }

    async fn set(&self, cookie: Cookie) -> Result<()> {
        let store_id = cookie.store_id.ok_or_else(|| {
            TabJarError::CookieRejected(format!("cookie '{}' has no store id", cookie.name))
        })?;
        let cookie = normalize(cookie)?;

        let mut scopes = self.scopes.write().await;
        let entry = scopes.entry(store_id).or_default();
        entry.retain(|existing| !existing.same_key(&cookie));

        // An already-expired cookie acts as a delete.
        if cookie.is_expired(unix_now()) {
            log::debug!("Expired cookie '{}' removed from store {}", cookie.name, store_id);
            return Ok(());
        }
        entry.push(cookie);
        Ok(())
    }

    async fn contains(&self, cookie: &Cookie) -> Result<bool> {
        let Some(store_id) = cookie.store_id else {
            return Ok(false);
        };
        let scopes = self.scopes.read().await;
        Ok(scopes
            .get(&store_id)
            .is_some_and(|cookies| cookies.iter().any(|c| c.same_key(cookie))))
    }

    async fn remove_store(&self, store_id: IsolationId) -> Result<usize> {
        let removed = self.scopes.write().await.remove(&store_id);
        Ok(removed.map(|cookies| cookies.len()).unwrap_or(0))
    }
}

/// Validate a cookie against its set URL and fill in host-derived fields.
fn normalize(mut cookie: Cookie) -> Result<Cookie> {
    let reject = |reason: String| Err(TabJarError::CookieRejected(reason));

    if cookie.name.is_empty() && cookie.value.is_empty() {
        return reject("cookie has neither name nor value".to_string());
    }

    let raw_url = cookie.set_url();
    let url = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(e) => return reject(format!("invalid url '{}': {}", raw_url, e)),
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return reject(format!("unsupported scheme '{}'", url.scheme()));
    }
    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return reject(format!("url '{}' has no host", raw_url));
    };
    let secure_origin = url.scheme() == "https";
    let ip_host = is_ip_host(&url);

    if cookie.secure && !secure_origin {
        return reject(format!(
            "secure cookie '{}' cannot be set over {}",
            cookie.name, raw_url
        ));
    }

    if cookie.domain.is_empty() {
        cookie.domain = host.clone();
        cookie.host_only = true;
    } else {
        cookie.domain = cookie.domain.to_ascii_lowercase();
        if cookie.host_only {
            cookie.domain = cookie.domain.trim_start_matches('.').to_string();
        }
        // IP hosts only ever match themselves.
        if !domain_matches(&cookie.domain, &host, cookie.host_only || ip_host) {
            return reject(format!(
                "domain '{}' does not match url host '{}'",
                cookie.domain, host
            ));
        }
        if ip_host {
            cookie.domain = host.clone();
            cookie.host_only = true;
        }
    }

    if cookie.path.is_empty() || !cookie.path.starts_with('/') {
        cookie.path = "/".to_string();
    }

    validate_prefix(&cookie, secure_origin)?;
    Ok(cookie)
}

fn is_ip_host(url: &Url) -> bool {
    matches!(url.host(), Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)))
}

/// `__Secure-` and `__Host-` prefix rules (RFC 6265bis).
fn validate_prefix(cookie: &Cookie, secure_origin: bool) -> Result<()> {
    if cookie.name.starts_with("__Secure-") && (!cookie.secure || !secure_origin) {
        return Err(TabJarError::CookieRejected(format!(
            "'{}' requires the secure attribute and a secure origin",
            cookie.name
        )));
    }
    if cookie.name.starts_with("__Host-")
        && (!cookie.secure
            || !secure_origin
            || cookie.path != "/"
            || cookie.domain.starts_with('.'))
    {
        return Err(TabJarError::CookieRejected(format!(
            "'{}' requires secure, path '/' and a host-only domain",
            cookie.name
        )));
    }
    Ok(())
}

/// RFC 6265 domain matching.
fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
    if host_only {
        return cookie_domain.eq_ignore_ascii_case(request_host);
    }

    let cookie_domain = cookie_domain.trim_start_matches('.');
    if request_host.eq_ignore_ascii_case(cookie_domain) {
        return true;
    }

    request_host.len() > cookie_domain.len()
        && request_host
            .get(request_host.len() - cookie_domain.len()..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(cookie_domain))
        && request_host.as_bytes()[request_host.len() - cookie_domain.len() - 1] == b'.'
}

/// RFC 6265 path matching.
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    if let Some(rest) = request_path.strip_prefix(cookie_path) {
        return cookie_path.ends_with('/') || rest.starts_with('/');
    }
    false
}
