use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::evaluator::PermissionResolver;
use super::loader::PermissionLoader;
use super::model::Resource;
use super::state::{AccessControl, AccessSnapshot};

/// A navigation entry and the resource it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    pub key: &'static str,
    pub resource: Resource,
}

const fn entry(key: &'static str, resource: Resource) -> MenuEntry {
    MenuEntry { key, resource }
}

/// Back-office navigation.
pub const NAVIGATION: &[MenuEntry] = &[
    entry("dashboard", Resource::Dashboard),
    entry("orders", Resource::Orders),
    entry("quotes", Resource::Quotes),
    entry("customers", Resource::Customers),
    entry("products", Resource::Products),
    entry("categories", Resource::Categories),
    entry("inventory", Resource::Inventory),
    entry("suppliers", Resource::Suppliers),
    entry("marketers", Resource::Marketers),
    entry("reports", Resource::Reports),
    entry("notifications", Resource::Notifications),
    entry("users", Resource::Users),
    entry("roles", Resource::Roles),
    entry("activity_log", Resource::ActivityLog),
    entry("settings", Resource::Settings),
    entry("settings.general", Resource::SettingsGeneral),
    entry("settings.backup", Resource::SettingsBackup),
    entry("settings.api", Resource::SettingsApi),
];

pub type MenuMap = BTreeMap<&'static str, bool>;

/// Visibility of every entry for one snapshot.
pub fn derive_menu(snapshot: &AccessSnapshot, resolver: &PermissionResolver, entries: &[MenuEntry]) -> MenuMap {
    let all_visible = snapshot.is_super_admin();
    entries
        .iter()
        .map(|e| (e.key, all_visible || snapshot.can_access(resolver, e.resource)))
        .collect()
}

/// Memoized menu projection, recomputed whenever the snapshot revision moves.
#[derive(Debug)]
pub struct MenuVisibility<L> {
    access: AccessControl<L>,
    entries: &'static [MenuEntry],
    cache: Mutex<Option<(u64, Arc<MenuMap>)>>,
}

impl<L: PermissionLoader> MenuVisibility<L> {
    pub fn new(access: AccessControl<L>) -> Self {
        Self::with_entries(access, NAVIGATION)
    }

    pub fn with_entries(access: AccessControl<L>, entries: &'static [MenuEntry]) -> Self {
        Self {
            access,
            entries,
            cache: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Arc<MenuMap> {
        let snapshot = self.access.snapshot();
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((revision, map)) = cache.as_ref() {
            if *revision == snapshot.revision {
                return Arc::clone(map);
            }
        }
        let map = Arc::new(derive_menu(&snapshot, self.access.resolver(), self.entries));
        *cache = Some((snapshot.revision, Arc::clone(&map)));
        map
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.current().get(key).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{Action, DirectoryLoader, RolePermission};
    use crate::directory::{Directory, DirectorySeed, DEMO_ADMIN_ID, DEMO_SUPER_ADMIN_ID};
    use crate::models::rbac::RoleUpdateRequest;

    async fn session(user: uuid::Uuid) -> (Arc<Directory>, AccessControl<DirectoryLoader>) {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        let principal = directory.principal(user).await.unwrap();
        let ac = AccessControl::new(DirectoryLoader::new(directory.clone()));
        ac.set_principal(Some(principal)).await.unwrap();
        (directory, ac)
    }

    #[tokio::test]
    async fn superuser_sees_everything() {
        let (_, ac) = session(DEMO_SUPER_ADMIN_ID).await;
        let menu = MenuVisibility::new(ac);
        let map = menu.current();
        assert_eq!(map.len(), NAVIGATION.len());
        assert!(map.values().all(|v| *v));
    }

    #[tokio::test]
    async fn regular_role_sees_only_viewable_entries() {
        let (_, ac) = session(DEMO_ADMIN_ID).await;
        let menu = MenuVisibility::new(ac.clone());
        for e in NAVIGATION {
            assert_eq!(menu.is_visible(e.key), ac.can_access(e.resource), "{}", e.key);
        }
        assert!(menu.is_visible("customers"));
        assert!(!menu.is_visible("orders"));
        assert!(!menu.is_visible("no_such_entry"));
    }

    #[tokio::test]
    async fn memoized_until_state_changes() {
        let (directory, ac) = session(DEMO_ADMIN_ID).await;
        let menu = MenuVisibility::new(ac.clone());

        let first = menu.current();
        assert!(Arc::ptr_eq(&first, &menu.current()));

        let req = RoleUpdateRequest {
            permissions: Some(vec![RolePermission::new(Resource::Orders, [Action::View])]),
            ..Default::default()
        };
        directory.update_role("role-admin", req).await.unwrap();
        ac.refresh().await;

        let second = menu.current();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.get("orders"), Some(&true));
        assert_eq!(second.get("customers"), Some(&false));
    }

    #[tokio::test]
    async fn nothing_visible_while_loading() {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        let ac = AccessControl::new(DirectoryLoader::new(directory));
        let menu = MenuVisibility::new(ac);
        assert!(menu.current().values().all(|v| !*v));
    }
}
