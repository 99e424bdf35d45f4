use std::sync::Arc;

use async_trait::async_trait;

use super::effective::EffectivePermission;
use super::evaluator::resolve;
use super::principal::AdminUser;
use super::role::Role;
use crate::directory::Directory;

/// What a permission load produces for one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedPermissions {
    pub role: Option<Role>,
    pub effective: Vec<EffectivePermission>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("permission store unavailable: {0}")]
    Unavailable(String),
    #[error("permission load timed out")]
    TimedOut,
}

/// Source of roles and grants for a principal.
#[async_trait]
pub trait PermissionLoader: Send + Sync + 'static {
    async fn load(&self, principal: &AdminUser) -> Result<LoadedPermissions, LoadError>;
}

/// Loads roles and grants from the in-memory [`Directory`].
///
/// Role resolution:
/// 1. principals claiming superuser (flag or `SUPER_ADMIN`), or whose role id
///    contains `super`, get the directory's superuser role
/// 2. the role with the principal's `role_id`
/// 3. the role whose code matches the principal's extended role
///
/// Superusers get no entries; every check short-circuits on the role.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    directory: Arc<Directory>,
}

impl DirectoryLoader {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory }
    }

    async fn resolve_role(&self, principal: &AdminUser) -> Option<Role> {
        if principal.claims_super_admin() || principal.role_id.to_ascii_lowercase().contains("super") {
            if let Some(role) = self.directory.superuser_role().await {
                return Some(role);
            }
        }

        if let Some(role) = self.directory.role(&principal.role_id).await {
            return Some(role);
        }

        match principal.extended_role {
            Some(extended) => self.directory.role_by_code(extended.as_str()).await,
            None => None,
        }
    }
}

#[async_trait]
impl PermissionLoader for DirectoryLoader {
    async fn load(&self, principal: &AdminUser) -> Result<LoadedPermissions, LoadError> {
        let role = self.resolve_role(principal).await.filter(|r| r.is_active);

        if role.as_ref().map(Role::is_superuser).unwrap_or(false) {
            return Ok(LoadedPermissions {
                role,
                effective: Vec::new(),
            });
        }

        let grants = self.directory.grants_for(principal.id).await;
        let effective = resolve(Some(principal), role.as_ref(), &grants);

        tracing::debug!(
            user_id = %principal.id,
            role = role.as_ref().map(|r| r.code.as_str()).unwrap_or("-"),
            entries = effective.len(),
            "permissions loaded"
        );

        Ok(LoadedPermissions { role, effective })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{Action, ExtendedRole, PermissionResolver, Resource};
    use crate::directory::{DirectorySeed, DEMO_ADMIN_ID, DEMO_SALES_ID, DEMO_SUPER_ADMIN_ID};
    use uuid::Uuid;

    fn loader() -> (Arc<Directory>, DirectoryLoader) {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        (directory.clone(), DirectoryLoader::new(directory))
    }

    #[tokio::test]
    async fn super_admin_extended_role_resolves_superuser() {
        let (_, loader) = loader();
        let user = AdminUser::new(Uuid::new_v4(), "Someone", "role-unknown").with_extended_role(ExtendedRole::SuperAdmin);
        let loaded = loader.load(&user).await.unwrap();

        let role = loaded.role.expect("role");
        assert!(role.is_superuser());
        assert!(loaded.effective.is_empty());
        assert!(PermissionResolver::new().has_permission(
            Some(&user),
            Some(&role),
            &loaded.effective,
            Resource::SettingsGeneral,
            Action::ManageApi
        ));
    }

    #[tokio::test]
    async fn role_falls_back_to_extended_role_code() {
        let (_, loader) = loader();
        let user = AdminUser::new(Uuid::new_v4(), "Someone", "role-missing").with_extended_role(ExtendedRole::Admin);
        let loaded = loader.load(&user).await.unwrap();
        assert_eq!(loaded.role.map(|r| r.id), Some("role-admin".to_string()));
    }

    #[tokio::test]
    async fn demo_accounts_resolve_expected_roles() {
        let (directory, loader) = loader();
        let admin = directory.principal(DEMO_ADMIN_ID).await.unwrap();
        let loaded = loader.load(&admin).await.unwrap();
        assert_eq!(loaded.role.as_ref().map(|r| r.code.as_str()), Some("ADMIN"));
        assert!(!PermissionResolver::new().has_permission(
            Some(&admin),
            loaded.role.as_ref(),
            &loaded.effective,
            Resource::Orders,
            Action::Approve
        ));

        let owner = directory.principal(DEMO_SUPER_ADMIN_ID).await.unwrap();
        assert!(loader.load(&owner).await.unwrap().role.unwrap().is_superuser());

        let sales = directory.principal(DEMO_SALES_ID).await.unwrap();
        let loaded = loader.load(&sales).await.unwrap();
        assert!(PermissionResolver::new().has_permission(
            Some(&sales),
            loaded.role.as_ref(),
            &loaded.effective,
            Resource::Quotes,
            Action::Approve
        ));
    }

    #[tokio::test]
    async fn unknown_role_loads_nothing() {
        let (_, loader) = loader();
        let user = AdminUser::new(Uuid::new_v4(), "Nobody", "role-missing");
        let loaded = loader.load(&user).await.unwrap();
        assert_eq!(loaded, LoadedPermissions::default());
    }
}
