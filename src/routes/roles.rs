//! Role editor API
//!
//! Role CRUD for the back office. Every endpoint is guarded by the caller's
//! `roles:*` permissions; edits are published to the activity log with
//! Critical severity and reload the sessions of affected users.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::app::AppState;
use crate::authz::{Action, Resource, Role};
use crate::errors::AppResult;
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::rbac::{CatalogEntry, RoleCreateRequest, RoleUpdateRequest, UserCountResponse};
use crate::session::AdminSession;

// =============================================================================
// ROLE ENDPOINTS
// =============================================================================

/// List all roles
#[utoipa::path(
    get,
    path = "/roles",
    tag = "Roles",
    responses(
        (status = 200, description = "List of roles", body = Vec<Role>),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_roles(State(state): State<AppState>, session: AdminSession) -> AppResult<Json<Vec<Role>>> {
    session.require(Resource::Roles, Action::View)?;
    Ok(Json(state.directory.list_roles().await))
}

/// Create a custom role
#[utoipa::path(
    post,
    path = "/roles",
    tag = "Roles",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Invalid role"),
        (status = 403, description = "Access denied"),
        (status = 409, description = "Role code already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    session: AdminSession,
    headers: HeaderMap,
    Json(req): Json<RoleCreateRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    session.require(Resource::Roles, Action::Create)?;

    let role = state.directory.create_role(req).await?;
    tracing::info!(user_id = %session.user_id, role = %role.code, "role created");

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(session.user_id),
        &role,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(role)))
}

/// Get a role by ID
#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = "Roles",
    params(
        ("id" = String, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Role details", body = Role),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_role(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> AppResult<Json<Role>> {
    session.require(Resource::Roles, Action::View)?;
    Ok(Json(state.directory.get_role(&id).await?))
}

/// Update a role
#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = "Roles",
    request_body = RoleUpdateRequest,
    params(
        ("id" = String, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 400, description = "Invalid role"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    session: AdminSession,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RoleUpdateRequest>,
) -> AppResult<Json<Role>> {
    session.require(Resource::Roles, Action::Edit)?;

    let (old, role) = state.directory.update_role(&id, req).await?;
    tracing::info!(user_id = %session.user_id, role = %role.code, "role updated");

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(session.user_id),
        &role,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );
    state.sessions.refresh_role_holders(&role.id).await;

    Ok(Json(role))
}

/// Delete a custom role
#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "Roles",
    params(
        ("id" = String, Path, description = "Role ID"),
    ),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "System role or role still assigned"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    session: AdminSession,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    session.require(Resource::Roles, Action::Delete)?;

    let role = state.directory.delete_role(&id).await?;
    tracing::info!(user_id = %session.user_id, role = %role.code, "role deleted");

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(session.user_id),
        &role,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Number of users holding a role
#[utoipa::path(
    get,
    path = "/roles/{id}/user-count",
    tag = "Roles",
    params(
        ("id" = String, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "User count", body = UserCountResponse),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn user_count(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> AppResult<Json<UserCountResponse>> {
    session.require(Resource::Roles, Action::View)?;
    let user_count = state.directory.user_count_by_role(&id).await?;
    Ok(Json(UserCountResponse { role_id: id, user_count }))
}

// =============================================================================
// PERMISSION CATALOG
// =============================================================================

/// Resources and the actions the role editor offers for each
#[utoipa::path(
    get,
    path = "/permissions/catalog",
    tag = "Roles",
    responses(
        (status = 200, description = "Permission matrix", body = Vec<CatalogEntry>),
        (status = 403, description = "Access denied"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn permission_catalog(session: AdminSession) -> AppResult<Json<Vec<CatalogEntry>>> {
    session.require(Resource::Roles, Action::View)?;

    let catalog = Resource::ALL
        .iter()
        .map(|resource| CatalogEntry {
            resource: *resource,
            display_name: resource.display_name(),
            actions: resource.available_actions().to_vec(),
        })
        .collect();

    Ok(Json(catalog))
}
