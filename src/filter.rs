//! Request filtering
//!
//! Decides which cookies a tab may attach to an outgoing request by asking
//! the tab's own cookie store for every candidate name.

use std::collections::BTreeSet;

use futures_util::stream::{self, StreamExt};

use crate::cookies::{Cookie, CookieQuery, CookieStore, RequestCookieMap};
use crate::error::{Result, TabJarError};
use crate::http::request::OutgoingRequest;
use crate::tabs::Tab;

/// Names of a cookie collection, for use as filtering candidates.
pub fn candidate_names(cookies: &[Cookie]) -> Vec<String> {
    cookies.iter().map(|c| c.name.clone()).collect()
}

/// Build the name-to-value mapping `tab` is entitled to send with `request`.
///
/// Lookups run concurrently, at most `concurrency` at a time, and all of them
/// are resolved before anything is admitted. A miss excludes the name; a
/// failed lookup is logged and treated as a miss.
pub async fn filter_request_cookies<S: CookieStore>(
    store: &S,
    request: &OutgoingRequest,
    tab: &Tab,
    candidates: &[String],
    concurrency: usize,
) -> Result<RequestCookieMap> {
    let store_id = tab
        .cookie_store_id
        .ok_or(TabJarError::TabNotIsolated(tab.id))?;

    let names: BTreeSet<&str> = candidates.iter().map(String::as_str).collect();
    let lookups = stream::iter(names.into_iter().map(|name| {
        let query = CookieQuery {
            name: name.to_string(),
            url: request.url.clone(),
            store_id,
        };
        async move {
            let result = store.get(&query).await;
            (query.name, result)
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut allowed = RequestCookieMap::new();
    for (name, result) in lookups {
        match result {
            Ok(Some(cookie)) => {
                allowed.insert(cookie.name, cookie.value);
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!(
                    "Cookie lookup for '{}' in store {} failed: {}",
                    name,
                    store_id,
                    err
                );
            }
        }
    }

    log::debug!(
        "Tab {} may send {} of {} candidate cookie(s) to {}",
        tab.id,
        allowed.len(),
        candidates.len(),
        request.url
    );
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::MemoryCookieStore;
    use crate::tabs::assign_isolation;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn seeded_tab(store: &MemoryCookieStore, id: u32, cookies: &[Cookie]) -> Tab {
        let mut tab = Tab::new(id);
        let store_id = assign_isolation(&mut tab);
        for cookie in cookies {
            store.set(cookie.scoped_to(store_id)).await.expect("seed");
        }
        tab
    }

    #[tokio::test]
    async fn admits_only_cookies_in_tab_scope() {
        let store = MemoryCookieStore::new();
        let owner = seeded_tab(&store, 1, &[Cookie::new("session", "abc", "example.com")]).await;
        let other = seeded_tab(&store, 2, &[]).await;
        let request = OutgoingRequest::get(owner.id, "https://example.com/").expect("request");

        let allowed = filter_request_cookies(&store, &request, &owner, &names(&["session"]), 4)
            .await
            .expect("filter");
        assert_eq!(allowed.get("session").map(String::as_str), Some("abc"));

        let denied = filter_request_cookies(&store, &request, &other, &names(&["session"]), 4)
            .await
            .expect("filter");
        assert!(denied.is_empty());
    }

    #[tokio::test]
    async fn duplicate_candidates_yield_one_entry() {
        let store = MemoryCookieStore::new();
        let tab = seeded_tab(
            &store,
            1,
            &[
                Cookie::new("a", "1", "example.com"),
                Cookie::new("b", "2", "example.com"),
            ],
        )
        .await;
        let request = OutgoingRequest::get(tab.id, "http://example.com/").expect("request");

        let allowed = filter_request_cookies(
            &store,
            &request,
            &tab,
            &names(&["a", "b", "a", "missing", "b"]),
            1,
        )
        .await
        .expect("filter");
        assert_eq!(allowed.len(), 2);
        assert_eq!(allowed.get("a").map(String::as_str), Some("1"));
        assert_eq!(allowed.get("b").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn url_scoping_excludes_other_hosts() {
        let store = MemoryCookieStore::new();
        let tab = seeded_tab(&store, 1, &[Cookie::new("session", "abc", "example.com")]).await;
        let request = OutgoingRequest::get(tab.id, "https://tracker.test/").expect("request");

        let allowed = filter_request_cookies(&store, &request, &tab, &names(&["session"]), 4)
            .await
            .expect("filter");
        assert!(allowed.is_empty());
    }

    #[tokio::test]
    async fn unisolated_tab_is_an_error() {
        let store = MemoryCookieStore::new();
        let tab = Tab::new(7);
        let request = OutgoingRequest::get(tab.id, "https://example.com/").expect("request");
        let err = filter_request_cookies(&store, &request, &tab, &[], 4)
            .await
            .expect_err("not isolated");
        assert!(matches!(err, TabJarError::TabNotIsolated(_)));
    }
}
