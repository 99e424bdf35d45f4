//! In-memory account and role directory.
//!
//! Holds the principals, roles, group grants and personal overrides the
//! permission loader reads, plus the role CRUD used by the role editor.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::authz::{Action, AdminUser, ExtendedRole, Grant, RawGrants, Resource, Role, RolePermission};
use crate::models::rbac::{RoleCreateRequest, RoleUpdateRequest};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("system role {0} cannot be deleted")]
    SystemRole(String),
    #[error("{0}")]
    Validation(String),
}

/// Users sharing a set of grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Uuid>,
    #[serde(default)]
    pub grants: Vec<Grant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverrides {
    pub user_id: Uuid,
    #[serde(default)]
    pub grants: Vec<Grant>,
}

/// Serializable starting content of a [`Directory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub users: Vec<AdminUser>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub overrides: Vec<UserOverrides>,
}

pub const DEMO_SUPER_ADMIN_ID: Uuid = Uuid::from_u128(0x5a1e_0000_0000_4000_8000_0000_0000_0001);
pub const DEMO_ADMIN_ID: Uuid = Uuid::from_u128(0x5a1e_0000_0000_4000_8000_0000_0000_0002);
pub const DEMO_SALES_ID: Uuid = Uuid::from_u128(0x5a1e_0000_0000_4000_8000_0000_0000_0003);

impl DirectorySeed {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read directory seed {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid directory seed {}", path.display()))
    }

    /// System roles and demo accounts used when no seed file is configured.
    pub fn builtin() -> Self {
        use Action::*;

        let roles = vec![
            Role::new("role-super-admin", "SUPER_ADMIN", "Super Admin")
                .with_name_ar("مدير عام")
                .system()
                .super_admin()
                .with_sort_order(0),
            Role::new("role-admin", "ADMIN", "ADMIN")
                .with_name_ar("مدير")
                .system()
                .with_sort_order(1)
                .grant(Resource::Dashboard, [View])
                .grant(Resource::Customers, [View, Create, Edit, Approve, Reject, ManageStatus])
                .grant(Resource::Products, [View, Create, Edit, Delete, Export, Import])
                .grant(Resource::Categories, [View, Create, Edit, Delete])
                .grant(Resource::Users, [View])
                .grant(Resource::Roles, [View])
                .grant(Resource::Reports, [View, Export]),
            Role::new("role-sales", "SALES", "Sales")
                .with_name_ar("مبيعات")
                .system()
                .with_sort_order(2)
                .grant(Resource::Dashboard, [View])
                .grant(Resource::Orders, [View, Create, Edit, ManageStatus])
                .grant(Resource::Quotes, [View, Create, Edit])
                .grant(Resource::Customers, [View]),
            Role::new("role-viewer", "VIEWER", "Viewer")
                .with_name_ar("مشاهد")
                .system()
                .with_sort_order(3)
                .grant(Resource::Dashboard, [View])
                .grant(Resource::Orders, [View])
                .grant(Resource::Products, [View]),
        ];

        let users = vec![
            AdminUser::new(DEMO_SUPER_ADMIN_ID, "Owner", "role-super-admin")
                .with_email("owner@example.com")
                .with_extended_role(ExtendedRole::SuperAdmin),
            AdminUser::new(DEMO_ADMIN_ID, "Back Office", "role-admin")
                .with_email("admin@example.com")
                .with_extended_role(ExtendedRole::Admin),
            AdminUser::new(DEMO_SALES_ID, "Sales Rep", "role-sales")
                .with_email("sales@example.com")
                .with_extended_role(ExtendedRole::Admin),
        ];

        let groups = vec![Group {
            id: "group-quote-approvers".to_string(),
            name: "Quote approvers".to_string(),
            members: vec![DEMO_SALES_ID],
            grants: vec![Grant::allow(Resource::Quotes, Approve), Grant::allow(Resource::Quotes, Reject)],
        }];

        Self {
            users,
            roles,
            groups,
            overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, AdminUser>,
    roles: HashMap<String, Role>,
    groups: Vec<Group>,
    overrides: HashMap<Uuid, Vec<Grant>>,
}

#[derive(Debug, Default)]
pub struct Directory {
    inner: RwLock<Inner>,
}

impl Directory {
    pub fn new(seed: DirectorySeed) -> Self {
        let inner = Inner {
            users: seed.users.into_iter().map(|u| (u.id, u)).collect(),
            roles: seed.roles.into_iter().map(|r| (r.id.clone(), r.normalized())).collect(),
            groups: seed.groups,
            overrides: seed.overrides.into_iter().map(|o| (o.user_id, o.grants)).collect(),
        };
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub async fn principal(&self, user_id: Uuid) -> Option<AdminUser> {
        self.inner.read().await.users.get(&user_id).cloned()
    }

    pub async fn upsert_principal(&self, user: AdminUser) {
        self.inner.write().await.users.insert(user.id, user);
    }

    pub async fn remove_principal(&self, user_id: Uuid) -> Option<AdminUser> {
        self.inner.write().await.users.remove(&user_id)
    }

    pub async fn set_overrides(&self, user_id: Uuid, grants: Vec<Grant>) {
        self.inner.write().await.overrides.insert(user_id, grants);
    }

    pub async fn role(&self, role_id: &str) -> Option<Role> {
        self.inner.read().await.roles.get(role_id).cloned()
    }

    pub async fn role_by_code(&self, code: &str) -> Option<Role> {
        self.inner
            .read()
            .await
            .roles
            .values()
            .find(|r| r.code.eq_ignore_ascii_case(code))
            .cloned()
    }

    /// The first active superuser role, preferring explicitly flagged roles.
    pub async fn superuser_role(&self) -> Option<Role> {
        let inner = self.inner.read().await;
        inner
            .roles
            .values()
            .filter(|r| r.is_active)
            .find(|r| r.is_super_admin)
            .or_else(|| inner.roles.values().filter(|r| r.is_active).find(|r| r.is_superuser()))
            .cloned()
    }

    /// Group and override grants that apply to `user_id`.
    pub async fn grants_for(&self, user_id: Uuid) -> RawGrants {
        let inner = self.inner.read().await;
        RawGrants {
            groups: inner
                .groups
                .iter()
                .filter(|g| g.members.contains(&user_id))
                .flat_map(|g| g.grants.iter().cloned())
                .collect(),
            overrides: inner.overrides.get(&user_id).cloned().unwrap_or_default(),
        }
    }

    pub async fn list_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.inner.read().await.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        roles
    }

    pub async fn get_role(&self, role_id: &str) -> Result<Role, DirectoryError> {
        self.role(role_id)
            .await
            .ok_or_else(|| DirectoryError::NotFound(format!("role {role_id}")))
    }

    pub async fn create_role(&self, req: RoleCreateRequest) -> Result<Role, DirectoryError> {
        let code = req.code.trim().to_string();
        let name = req.name.trim().to_string();
        if code.is_empty() || name.is_empty() {
            return Err(DirectoryError::Validation("role code and name are required".into()));
        }
        validate_permissions(&req.permissions)?;

        let mut inner = self.inner.write().await;
        if inner.roles.values().any(|r| r.code.eq_ignore_ascii_case(&code)) {
            return Err(DirectoryError::Conflict(format!("role code {code} already exists")));
        }

        // Hex ids never contain "super", so custom roles cannot match the superuser convention by id.
        let mut role = Role::new(format!("role-{}", Uuid::new_v4().simple()), code, name);
        role.name_ar = req.name_ar.unwrap_or_default();
        role.description = req.description;
        role.sort_order = req.sort_order.unwrap_or(100);
        role.permissions = req.permissions;
        let role = role.normalized();
        reject_superuser_lookalike(&role)?;

        inner.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    /// Applies `req` and returns `(old, new)`.
    pub async fn update_role(&self, role_id: &str, req: RoleUpdateRequest) -> Result<(Role, Role), DirectoryError> {
        if let Some(permissions) = &req.permissions {
            validate_permissions(permissions)?;
        }

        let mut inner = self.inner.write().await;
        let current = inner
            .roles
            .get(role_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("role {role_id}")))?;

        let mut updated = current.clone();
        if let Some(code) = req.code {
            let code = code.trim().to_string();
            if current.is_system && !code.eq_ignore_ascii_case(&current.code) {
                return Err(DirectoryError::Validation("system role codes cannot change".into()));
            }
            if inner
                .roles
                .values()
                .any(|r| r.id != current.id && r.code.eq_ignore_ascii_case(&code))
            {
                return Err(DirectoryError::Conflict(format!("role code {code} already exists")));
            }
            updated.code = code;
        }
        if let Some(name) = req.name {
            updated.name = name;
        }
        if let Some(name_ar) = req.name_ar {
            updated.name_ar = name_ar;
        }
        if let Some(description) = req.description {
            updated.description = Some(description);
        }
        if let Some(is_active) = req.is_active {
            updated.is_active = is_active;
        }
        if let Some(sort_order) = req.sort_order {
            updated.sort_order = sort_order;
        }
        if let Some(permissions) = req.permissions {
            updated.permissions = permissions;
        }
        let updated = updated.normalized();
        if !current.is_superuser() {
            reject_superuser_lookalike(&updated)?;
        }

        inner.roles.insert(updated.id.clone(), updated.clone());
        Ok((current, updated))
    }

    /// Removes a custom role that no user holds.
    pub async fn delete_role(&self, role_id: &str) -> Result<Role, DirectoryError> {
        let mut inner = self.inner.write().await;
        let role = inner
            .roles
            .get(role_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("role {role_id}")))?;

        if role.is_system {
            return Err(DirectoryError::SystemRole(role.code.clone()));
        }
        let holders = inner.users.values().filter(|u| u.role_id == role_id).count();
        if holders > 0 {
            return Err(DirectoryError::Conflict(format!(
                "role {} is assigned to {holders} user(s)",
                role.code
            )));
        }

        inner
            .roles
            .remove(role_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("role {role_id}")))
    }

    pub async fn user_count_by_role(&self, role_id: &str) -> Result<usize, DirectoryError> {
        let inner = self.inner.read().await;
        if !inner.roles.contains_key(role_id) {
            return Err(DirectoryError::NotFound(format!("role {role_id}")));
        }
        Ok(inner.users.values().filter(|u| u.role_id == role_id).count())
    }

    /// Ids of users currently holding `role_id`.
    pub async fn holders_of(&self, role_id: &str) -> Vec<Uuid> {
        self.inner
            .read()
            .await
            .users
            .values()
            .filter(|u| u.role_id == role_id)
            .map(|u| u.id)
            .collect()
    }
}

fn validate_permissions(permissions: &[RolePermission]) -> Result<(), DirectoryError> {
    for perm in permissions {
        if let Some(action) = perm.actions.iter().find(|a| !perm.resource.supports(**a)) {
            return Err(DirectoryError::Validation(format!(
                "action {} is not available for {}",
                action, perm.resource
            )));
        }
    }
    Ok(())
}

fn reject_superuser_lookalike(role: &Role) -> Result<(), DirectoryError> {
    if role.is_superuser() {
        return Err(DirectoryError::Validation(format!(
            "role {} is reserved for the superuser",
            role.code
        )));
    }
    Ok(())
}
