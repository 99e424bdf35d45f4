use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::{Action, Resource};

/// Code of the built-in superuser role.
pub const SUPER_ADMIN_CODE: &str = "SUPER_ADMIN";

/// Actions a role grants on a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RolePermission {
    pub resource: Resource,
    pub actions: Vec<Action>,
}

impl RolePermission {
    pub fn new(resource: Resource, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            resource,
            actions: actions.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub name_ar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub permissions: Vec<RolePermission>,
}

fn default_true() -> bool {
    true
}

impl Role {
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            name_ar: String::new(),
            description: None,
            is_system: false,
            is_active: true,
            sort_order: 0,
            is_super_admin: false,
            permissions: Vec::new(),
        }
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn super_admin(mut self) -> Self {
        self.is_super_admin = true;
        self
    }

    pub fn with_name_ar(mut self, name_ar: impl Into<String>) -> Self {
        self.name_ar = name_ar.into();
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn grant(mut self, resource: Resource, actions: impl IntoIterator<Item = Action>) -> Self {
        self.permissions.push(RolePermission::new(resource, actions));
        self.normalized()
    }

    /// Collapses duplicate resource entries into their union, keeping one
    /// entry per resource in resource order.
    pub fn normalized(mut self) -> Self {
        let mut merged: BTreeMap<Resource, Vec<Action>> = BTreeMap::new();
        for entry in self.permissions.drain(..) {
            let actions = merged.entry(entry.resource).or_default();
            for action in entry.actions {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        self.permissions = merged
            .into_iter()
            .map(|(resource, mut actions)| {
                actions.sort();
                RolePermission { resource, actions }
            })
            .collect();
        self
    }

    /// Whether the role statically grants `action` on `resource`.
    pub fn grants(&self, resource: Resource, action: Action) -> bool {
        self.permissions
            .iter()
            .any(|p| p.resource == resource && p.actions.contains(&action))
    }

    /// Superuser roles bypass every check.
    ///
    /// The explicit flag is authoritative. Roles loaded without it are
    /// recognised by the `SUPER_ADMIN` code/name or a `super` role id.
    pub fn is_superuser(&self) -> bool {
        self.is_super_admin || self.matches_superuser_convention()
    }

    fn matches_superuser_convention(&self) -> bool {
        normalize_code(&self.code) == SUPER_ADMIN_CODE
            || normalize_code(&self.name) == SUPER_ADMIN_CODE
            || self.id.to_ascii_lowercase().contains("super")
    }
}

fn normalize_code(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}
