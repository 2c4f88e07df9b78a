//! Tab assignment
//!
//! Every tab gets an isolation identifier the moment it is created. The
//! identifier names the cookie store the tab reads from and writes into.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of one isolated cookie store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsolationId(Uuid);

impl IsolationId {
    /// Generate a fresh random identifier.
    ///
    /// Generation has no fallback: if the system RNG is unavailable the
    /// generator aborts the process.
    pub fn generate() -> Self {
        IsolationId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for IsolationId {
    fn from(uuid: Uuid) -> Self {
        IsolationId(uuid)
    }
}

impl fmt::Display for IsolationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-assigned tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tab record as delivered by the host, plus the extension-visible store id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_store_id: Option<IsolationId>,
    /// Container name used for grouping, when the host provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl Tab {
    pub fn new(id: u32) -> Self {
        Self {
            id: TabId(id),
            cookie_store_id: None,
            container: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

/// Attach a freshly generated isolation identifier to `tab`.
pub fn assign_isolation(tab: &mut Tab) -> IsolationId {
    let id = IsolationId::generate();
    tab.cookie_store_id = Some(id);
    id
}

/// One isolated cookie store and the tabs that use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieStoreRecord {
    pub id: IsolationId,
    pub tab_ids: Vec<TabId>,
    pub container: Option<String>,
}

/// Outcome of closing a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabRemoval {
    /// The tab was the last user of the store; its cookies can be evicted.
    Released(IsolationId),
    /// Other tabs still use the store.
    Shared(IsolationId),
}

/// Tracks which tab uses which cookie store.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: HashMap<TabId, IsolationId>,
    stores: HashMap<IsolationId, CookieStoreRecord>,
    group_by_container: bool,
}

impl TabRegistry {
    pub fn new(group_by_container: bool) -> Self {
        Self {
            tabs: HashMap::new(),
            stores: HashMap::new(),
            group_by_container,
        }
    }

    /// Handle a tab-creation event.
    ///
    /// Without grouping every tab gets a new store. With grouping, a tab
    /// carrying a container name joins the store of that container.
    pub fn on_created(&mut self, tab: &mut Tab) -> IsolationId {
        if let Some(previous) = self.tabs.get(&tab.id).copied() {
            log::warn!(
                "Tab {} created twice; detaching it from store {}",
                tab.id,
                previous
            );
            self.detach(tab.id, previous);
        }

        let shared = if self.group_by_container {
            tab.container
                .as_deref()
                .and_then(|name| self.store_for_container(name))
        } else {
            None
        };

        let id = match shared {
            Some(id) => {
                tab.cookie_store_id = Some(id);
                if let Some(record) = self.stores.get_mut(&id) {
                    record.tab_ids.push(tab.id);
                }
                log::debug!("Tab {} joined cookie store {}", tab.id, id);
                id
            }
            None => {
                let id = assign_isolation(tab);
                let container = if self.group_by_container {
                    tab.container.clone()
                } else {
                    None
                };
                self.stores.insert(
                    id,
                    CookieStoreRecord {
                        id,
                        tab_ids: vec![tab.id],
                        container,
                    },
                );
                log::debug!("Tab {} assigned new cookie store {}", tab.id, id);
                id
            }
        };

        self.tabs.insert(tab.id, id);
        id
    }

    /// Handle a tab-removal event. Returns `None` for tabs never seen.
    pub fn on_removed(&mut self, tab_id: TabId) -> Option<TabRemoval> {
        let id = self.tabs.remove(&tab_id)?;
        Some(self.detach(tab_id, id))
    }

    pub fn isolation_id(&self, tab_id: TabId) -> Option<IsolationId> {
        self.tabs.get(&tab_id).copied()
    }

    pub fn store(&self, id: IsolationId) -> Option<&CookieStoreRecord> {
        self.stores.get(&id)
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    fn store_for_container(&self, name: &str) -> Option<IsolationId> {
        self.stores
            .values()
            .find(|record| record.container.as_deref() == Some(name))
            .map(|record| record.id)
    }

    fn detach(&mut self, tab_id: TabId, id: IsolationId) -> TabRemoval {
        let Some(record) = self.stores.get_mut(&id) else {
            return TabRemoval::Released(id);
        };
        record.tab_ids.retain(|t| *t != tab_id);
        if record.tab_ids.is_empty() {
            self.stores.remove(&id);
            TabRemoval::Released(id)
        } else {
            TabRemoval::Shared(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_isolation_sets_store_id() {
        let mut tab = Tab::new(1);
        let id = assign_isolation(&mut tab);
        assert_eq!(tab.cookie_store_id, Some(id));
    }

    #[test]
    fn independent_tabs_get_distinct_ids() {
        let mut registry = TabRegistry::new(false);
        let ids: Vec<_> = (0..64)
            .map(|n| registry.on_created(&mut Tab::new(n)))
            .collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(registry.store_count(), 64);
    }

    #[test]
    fn containers_are_ignored_without_grouping() {
        let mut registry = TabRegistry::new(false);
        let a = registry.on_created(&mut Tab::new(1).with_container("work"));
        let b = registry.on_created(&mut Tab::new(2).with_container("work"));
        assert_ne!(a, b);
    }

    #[test]
    fn grouped_tabs_share_store_until_last_closes() {
        let mut registry = TabRegistry::new(true);
        let mut first = Tab::new(1).with_container("work");
        let mut second = Tab::new(2).with_container("work");
        let a = registry.on_created(&mut first);
        let b = registry.on_created(&mut second);
        assert_eq!(a, b);
        assert_eq!(second.cookie_store_id, Some(a));
        assert_eq!(registry.store(a).map(|r| r.tab_ids.len()), Some(2));

        assert_eq!(registry.on_removed(TabId(1)), Some(TabRemoval::Shared(a)));
        assert_eq!(registry.on_removed(TabId(2)), Some(TabRemoval::Released(a)));
        assert_eq!(registry.store_count(), 0);
    }

    #[test]
    fn removing_unknown_tab_is_none() {
        let mut registry = TabRegistry::new(false);
        assert_eq!(registry.on_removed(TabId(9)), None);
    }

    #[test]
    fn recreated_tab_gets_new_store() {
        let mut registry = TabRegistry::new(false);
        let first = registry.on_created(&mut Tab::new(3));
        let second = registry.on_created(&mut Tab::new(3));
        assert_ne!(first, second);
        assert_eq!(registry.isolation_id(TabId(3)), Some(second));
        assert!(registry.store(first).is_none());
    }
}
