//! Cookie propagation
//!
//! Re-issues a batch of domain cookies into a tab's own cookie store.
//! Propagation is best-effort: each cookie is written independently and a
//! rejected cookie never stops the rest of the batch.

use crate::config::ConflictPolicy;
use crate::cookies::{Cookie, CookieStore};
use crate::error::{Result, TabJarError};
use crate::tabs::Tab;

/// A cookie the store refused, with the reason it gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub domain: String,
    pub reason: String,
}

/// What happened to each cookie of one propagation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub written: usize,
    pub skipped: usize,
    pub rejected: Vec<Rejection>,
}

impl PropagationReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Copy `cookies` into the cookie store assigned to `tab`.
///
/// Fails only when the tab has no store assigned; per-cookie failures are
/// logged and collected in the report.
pub async fn propagate_cookies<S: CookieStore>(
    store: &S,
    tab: &Tab,
    cookies: &[Cookie],
    policy: ConflictPolicy,
) -> Result<PropagationReport> {
    let store_id = tab
        .cookie_store_id
        .ok_or(TabJarError::TabNotIsolated(tab.id))?;

    let mut report = PropagationReport::default();
    for cookie in cookies {
        let scoped = cookie.scoped_to(store_id);

        if policy == ConflictPolicy::Skip {
            match store.contains(&scoped).await {
                Ok(true) => {
                    log::debug!(
                        "Keeping existing cookie '{}' for {} in store {}",
                        scoped.name,
                        scoped.domain,
                        store_id
                    );
                    report.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    log::warn!(
                        "Could not check for existing cookie '{}' in store {}: {}",
                        scoped.name,
                        store_id,
                        err
                    );
                }
            }
        }

        let (name, domain) = (scoped.name.clone(), scoped.domain.clone());
        match store.set(scoped).await {
            Ok(()) => report.written += 1,
            Err(err) => {
                log::warn!(
                    "Failed to propagate cookie '{}' for {} into store {}: {}",
                    name,
                    domain,
                    store_id,
                    err
                );
                report.rejected.push(Rejection {
                    name,
                    domain,
                    reason: err.to_string(),
                });
            }
        }
    }

    log::debug!(
        "Propagated {} cookie(s) to tab {} ({} skipped, {} rejected)",
        report.written,
        tab.id,
        report.skipped,
        report.rejected.len()
    );
    Ok(report)
}
