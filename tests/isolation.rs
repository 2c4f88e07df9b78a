use tabjar::config::Config;
use tabjar::cookies::{Cookie, CookieQuery, CookieStore, MemoryCookieStore};
use tabjar::http::request::OutgoingRequest;
use tabjar::tabs::{Tab, TabId};
use tabjar::Extension;
use url::Url;

fn extension() -> Extension<MemoryCookieStore> {
    Extension::new(MemoryCookieStore::new(), Config::default())
}

async fn request_cookies(
    ext: &Extension<MemoryCookieStore>,
    tab: TabId,
    url: &str,
) -> std::collections::BTreeMap<String, String> {
    let mut request = OutgoingRequest::get(tab, url).expect("request");
    ext.on_before_send_headers(&mut request, None)
        .await
        .expect("filter")
}

#[tokio::test]
async fn test_session_cookie_reaches_only_its_tab() {
    let ext = extension();
    let t1 = ext.on_tab_created(Tab::new(1));
    let t2 = ext.on_tab_created(Tab::new(2));
    assert_ne!(t1.cookie_store_id, t2.cookie_store_id);

    ext.on_domain_cookies(t1.id, &[Cookie::new("session", "abc", "example.com")])
        .await
        .expect("propagate");

    let stored = ext
        .store()
        .cookies_in(t1.cookie_store_id.expect("isolated"))
        .await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].store_id, t1.cookie_store_id);
    assert_eq!(stored[0].value, "abc");

    let own = request_cookies(&ext, t1.id, "https://example.com").await;
    assert_eq!(own.get("session").map(String::as_str), Some("abc"));
    assert_eq!(own.len(), 1);

    let other = request_cookies(&ext, t2.id, "https://example.com").await;
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_round_trip_and_isolation_per_cookie() {
    let ext = extension();
    let t1 = ext.on_tab_created(Tab::new(1));
    let t2 = ext.on_tab_created(Tab::new(2));
    let cookies = vec![
        Cookie::new("a", "1", "example.com"),
        Cookie::new("b", "2", ".example.com"),
        Cookie::new("c", "3", "example.com").with_path("/docs"),
    ];
    ext.on_domain_cookies(t1.id, &cookies).await.expect("propagate");

    for cookie in &cookies {
        let url = Url::parse(&format!("http://example.com{}", cookie.path)).expect("url");
        let in_t1 = ext
            .store()
            .get(&CookieQuery {
                name: cookie.name.clone(),
                url: url.clone(),
                store_id: t1.cookie_store_id.expect("isolated"),
            })
            .await
            .expect("get");
        assert_eq!(in_t1.map(|c| c.value), Some(cookie.value.clone()));

        let in_t2 = ext
            .store()
            .get(&CookieQuery {
                name: cookie.name.clone(),
                url,
                store_id: t2.cookie_store_id.expect("isolated"),
            })
            .await
            .expect("get");
        assert!(in_t2.is_none());
    }
}

#[tokio::test]
async fn test_rejected_cookie_leaves_rest_of_batch() {
    let ext = extension();
    let tab = ext.on_tab_created(Tab::new(1));
    let report = ext
        .on_domain_cookies(
            tab.id,
            &[
                Cookie::new("secret", "x", "example.com")
                    .secure(true)
                    .with_url("http://example.com/"),
                Cookie::new("session", "abc", "example.com"),
            ],
        )
        .await
        .expect("propagate");
    assert_eq!(report.rejected.len(), 1);

    let sent = request_cookies(&ext, tab.id, "http://example.com/").await;
    assert_eq!(sent.get("session").map(String::as_str), Some("abc"));
    assert!(!sent.contains_key("secret"));
}

#[tokio::test]
async fn test_closing_tab_evicts_its_store() {
    let ext = extension();
    let tab = ext.on_tab_created(Tab::new(1));
    ext.on_domain_cookies(tab.id, &[Cookie::new("session", "abc", "example.com")])
        .await
        .expect("propagate");

    let evicted = ext.on_tab_removed(tab.id).await.expect("removed");
    assert_eq!(evicted, 1);
    assert_eq!(ext.store().total_cookie_count().await, 0);
    assert!(ext.tab(tab.id).is_none());
}

#[tokio::test]
async fn test_container_group_shares_cookies() {
    let config = Config {
        group_by_container: true,
        ..Config::default()
    };
    let ext = Extension::new(MemoryCookieStore::new(), config);
    let work1 = ext.on_tab_created(Tab::new(1).with_container("work"));
    let work2 = ext.on_tab_created(Tab::new(2).with_container("work"));
    let personal = ext.on_tab_created(Tab::new(3).with_container("personal"));

    ext.on_domain_cookies(work1.id, &[Cookie::new("sso", "w", "example.com")])
        .await
        .expect("propagate");

    let shared = request_cookies(&ext, work2.id, "http://example.com/").await;
    assert_eq!(shared.get("sso").map(String::as_str), Some("w"));
    let isolated = request_cookies(&ext, personal.id, "http://example.com/").await;
    assert!(isolated.is_empty());

    assert_eq!(ext.on_tab_removed(work1.id).await.expect("removed"), 0);
    let still = request_cookies(&ext, work2.id, "http://example.com/").await;
    assert_eq!(still.len(), 1);
    assert_eq!(ext.on_tab_removed(work2.id).await.expect("removed"), 1);
}

#[tokio::test]
async fn test_explicit_candidates_override_index() {
    let ext = extension();
    let tab = ext.on_tab_created(Tab::new(1));
    ext.on_domain_cookies(
        tab.id,
        &[
            Cookie::new("a", "1", "example.com"),
            Cookie::new("b", "2", "example.com"),
        ],
    )
    .await
    .expect("propagate");

    let mut request = OutgoingRequest::get(tab.id, "http://example.com/").expect("request");
    let candidates = vec!["b".to_string()];
    let cookies = ext
        .on_before_send_headers(&mut request, Some(&candidates))
        .await
        .expect("filter");
    assert_eq!(cookies.len(), 1);
    assert_eq!(request.header("Cookie"), Some("b=2"));
}
