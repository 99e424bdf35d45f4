use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::{permission_key, Action, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn is_allow(&self) -> bool {
        matches!(self, Effect::Allow)
    }
}

/// Where an entry came from. Ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSource {
    Role,
    Group,
    Override,
}

/// A raw grant coming from a group membership or a personal override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Grant {
    pub resource: Resource,
    pub action: Action,
    pub effect: Effect,
}

impl Grant {
    pub fn allow(resource: Resource, action: Action) -> Self {
        Self { resource, action, effect: Effect::Allow }
    }

    pub fn deny(resource: Resource, action: Action) -> Self {
        Self { resource, action, effect: Effect::Deny }
    }
}

/// Group and override grants held for one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RawGrants {
    #[serde(default)]
    pub groups: Vec<Grant>,
    #[serde(default)]
    pub overrides: Vec<Grant>,
}

impl RawGrants {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.overrides.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EffectivePermission {
    #[schema(example = "orders:edit")]
    pub permission_key: String,
    pub resource: Resource,
    pub action: Action,
    pub source: PermissionSource,
    pub effect: Effect,
}

impl EffectivePermission {
    pub fn new(resource: Resource, action: Action, source: PermissionSource, effect: Effect) -> Self {
        Self {
            permission_key: permission_key(resource, action),
            resource,
            action,
            source,
            effect,
        }
    }

    pub fn from_grant(grant: &Grant, source: PermissionSource) -> Self {
        Self::new(grant.resource, grant.action, source, grant.effect)
    }

    pub fn matches(&self, resource: Resource, action: Action) -> bool {
        self.resource == resource && self.action == action
    }
}
