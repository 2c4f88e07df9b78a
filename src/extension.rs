//! Host event wiring
//!
//! Routes the host runtime's tab and request events to tab assignment,
//! cookie propagation and request filtering. Those three never call each
//! other; this module is the only place that knows about all of them.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;

use crate::config::Config;
use crate::cookies::{Cookie, CookieStore, RequestCookieMap};
use crate::error::{Result, TabJarError};
use crate::filter::{candidate_names, filter_request_cookies};
use crate::http::request::OutgoingRequest;
use crate::propagation::{propagate_cookies, PropagationReport};
use crate::tabs::{IsolationId, Tab, TabId, TabRegistry, TabRemoval};

#[derive(Debug, Default)]
struct TabState {
    registry: TabRegistry,
    tabs: HashMap<TabId, Tab>,
}

/// An event delivered by the host runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    TabCreated {
        tab: TabId,
        #[serde(default)]
        container: Option<String>,
    },
    TabRemoved {
        tab: TabId,
    },
    DomainCookies {
        tab: TabId,
        cookies: Vec<Cookie>,
    },
    Request {
        tab: TabId,
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: Vec<String>,
        /// Overrides the default all-cookies source for this request.
        #[serde(default)]
        candidates: Option<Vec<String>>,
    },
}

fn default_method() -> String {
    "GET".to_string()
}

/// What handling one event produced.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    TabCreated(Tab),
    TabRemoved { tab: TabId, evicted: usize },
    Propagated { tab: TabId, report: PropagationReport },
    Request {
        request: OutgoingRequest,
        cookies: RequestCookieMap,
    },
}

/// The extension's background process: one cookie store, many tabs.
pub struct Extension<S> {
    store: S,
    config: Config,
    state: RwLock<TabState>,
    /// Names of cookies propagated into each live store; the default
    /// candidate set for requests from that store's tabs.
    known_cookies: RwLock<HashMap<IsolationId, BTreeSet<String>>>,
}

impl<S: CookieStore> Extension<S> {
    pub fn new(store: S, config: Config) -> Self {
        let state = TabState {
            registry: TabRegistry::new(config.group_by_container),
            tabs: HashMap::new(),
        };
        Self {
            store,
            config,
            state: RwLock::new(state),
            known_cookies: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tab(&self, tab_id: TabId) -> Option<Tab> {
        self.read_state().tabs.get(&tab_id).cloned()
    }

    /// Every cookie name propagated into a store that is still in use.
    pub fn known_cookie_names(&self) -> Vec<String> {
        let known = self.known_cookies.read().unwrap_or_else(PoisonError::into_inner);
        known
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cookie names propagated into one store.
    pub fn known_cookie_names_in(&self, store_id: IsolationId) -> Vec<String> {
        self.known_cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&store_id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Tab created: assign its cookie store before it can send anything.
    ///
    /// A repeated creation event for a live tab keeps the existing assignment.
    pub fn on_tab_created(&self, mut tab: Tab) -> Tab {
        let mut state = self.write_state();
        if let Some(existing) = state.tabs.get(&tab.id) {
            log::warn!("Ignoring repeated creation event for tab {}", tab.id);
            return existing.clone();
        }
        let id = state.registry.on_created(&mut tab);
        log::info!("Tab {} isolated in cookie store {}", tab.id, id);
        state.tabs.insert(tab.id, tab.clone());
        tab
    }

    /// Tab closed: evict its cookie store once no other tab uses it.
    pub async fn on_tab_removed(&self, tab_id: TabId) -> Result<usize> {
        let removal = {
            let mut state = self.write_state();
            state.tabs.remove(&tab_id);
            let removal = state.registry.on_removed(tab_id);
            if let Some(TabRemoval::Released(id)) = removal {
                self.forget_names(id);
            }
            removal
        };

        match removal {
            Some(TabRemoval::Released(id)) => {
                let evicted = self.store.remove_store(id).await?;
                log::info!(
                    "Tab {} closed; evicted {} cookie(s) from store {}",
                    tab_id,
                    evicted,
                    id
                );
                Ok(evicted)
            }
            Some(TabRemoval::Shared(id)) => {
                log::debug!("Tab {} closed; store {} still in use", tab_id, id);
                Ok(0)
            }
            None => Err(TabJarError::UnknownTab(tab_id)),
        }
    }

    /// Domain cookies changed: copy them into the tab's store.
    pub async fn on_domain_cookies(
        &self,
        tab_id: TabId,
        cookies: &[Cookie],
    ) -> Result<PropagationReport> {
        let tab = self.tab(tab_id).ok_or(TabJarError::UnknownTab(tab_id))?;
        let store_id = tab
            .cookie_store_id
            .ok_or(TabJarError::TabNotIsolated(tab_id))?;
        let report =
            propagate_cookies(&self.store, &tab, cookies, self.config.conflict_policy).await?;

        // The tab may have closed while writes were in flight; its scope must
        // not outlive it.
        let still_in_use = {
            let state = self.read_state();
            let in_use = state.registry.store(store_id).is_some();
            if in_use {
                self.known_cookies
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(store_id)
                    .or_default()
                    .extend(candidate_names(cookies));
            }
            in_use
        };

        if !still_in_use {
            let evicted = self.store.remove_store(store_id).await?;
            log::info!(
                "Tab {} closed during propagation; evicted {} cookie(s) from store {}",
                tab_id,
                evicted,
                store_id
            );
        }
        Ok(report)
    }

    /// Pre-send-headers hook: replace the request's cookies with the ones
    /// the issuing tab is entitled to send.
    ///
    /// `candidates` defaults to every cookie name propagated into the tab's
    /// own store.
    pub async fn on_before_send_headers(
        &self,
        request: &mut OutgoingRequest,
        candidates: Option<&[String]>,
    ) -> Result<RequestCookieMap> {
        let tab = self
            .tab(request.tab_id)
            .ok_or(TabJarError::UnknownTab(request.tab_id))?;

        let known;
        let candidates = match (candidates, tab.cookie_store_id) {
            (Some(candidates), _) => candidates,
            (None, Some(store_id)) => {
                known = self.known_cookie_names_in(store_id);
                &known[..]
            }
            (None, None) => &[],
        };

        let cookies = filter_request_cookies(
            &self.store,
            request,
            &tab,
            candidates,
            self.config.lookup_concurrency,
        )
        .await?;
        request.merge_cookies(&cookies, self.config.header_merge);
        Ok(cookies)
    }

    /// Handle one host event.
    pub async fn dispatch(&self, event: HostEvent) -> Result<EventOutcome> {
        match event {
            HostEvent::TabCreated { tab, container } => {
                let tab = Tab {
                    id: tab,
                    cookie_store_id: None,
                    container,
                };
                Ok(EventOutcome::TabCreated(self.on_tab_created(tab)))
            }
            HostEvent::TabRemoved { tab } => {
                let evicted = self.on_tab_removed(tab).await?;
                Ok(EventOutcome::TabRemoved { tab, evicted })
            }
            HostEvent::DomainCookies { tab, cookies } => {
                let report = self.on_domain_cookies(tab, &cookies).await?;
                Ok(EventOutcome::Propagated { tab, report })
            }
            HostEvent::Request {
                tab,
                url,
                method,
                headers,
                candidates,
            } => {
                let mut request = OutgoingRequest::new(tab, &method, &url)?;
                for line in &headers {
                    let (name, value) = crate::utils::StringUtils::parse_header(line)?;
                    request = request.with_header(name, value);
                }
                let cookies = self
                    .on_before_send_headers(&mut request, candidates.as_deref())
                    .await?;
                Ok(EventOutcome::Request { request, cookies })
            }
        }
    }

    fn forget_names(&self, store_id: IsolationId) {
        self.known_cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&store_id);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TabState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TabState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
