use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{Action, EffectivePermission, ExtendedRole, Resource, Role, RolePermission};
use crate::events::{Loggable, Severity};

// =============================================================================
// ROLE
// =============================================================================

impl Loggable for Role {
    fn entity_type() -> &'static str { "role" }
    fn subject_id(&self) -> String { self.id.clone() }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "WAREHOUSE")]
    pub code: String,
    #[schema(example = "Warehouse staff")]
    pub name: String,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub permissions: Vec<RolePermission>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
    pub permissions: Option<Vec<RolePermission>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCountResponse {
    pub role_id: String,
    pub user_count: usize,
}

/// One row of the role editor's permission matrix.
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub resource: Resource,
    pub display_name: &'static str,
    pub actions: Vec<Action>,
}

// =============================================================================
// SELF INSPECTION
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct PrincipalSummary {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub role_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_role: Option<ExtendedRole>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyPermissions {
    pub principal: PrincipalSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub is_super_admin: bool,
    pub permissions: Vec<EffectivePermission>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuResponse {
    pub entries: BTreeMap<String, bool>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckQuery {
    /// Resource name, e.g. `orders`
    pub resource: String,
    /// Action name, e.g. `edit`. Defaults to `view`.
    pub action: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckResponse {
    pub permission_key: String,
    pub allowed: bool,
}
