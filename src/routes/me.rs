//! Self-inspection endpoints for the signed-in back-office user.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::MenuVisibility;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::rbac::{CheckQuery, CheckResponse, MenuResponse, MyPermissions, PrincipalSummary};
use crate::session::AdminSession;

fn summarize(session: &AdminSession) -> AppResult<MyPermissions> {
    let snapshot = session.access.snapshot();
    let is_super_admin = snapshot.is_super_admin();
    let principal = snapshot
        .principal
        .ok_or_else(|| AppError::unauthorized("session has no principal"))?;

    Ok(MyPermissions {
        principal: PrincipalSummary {
            id: principal.id,
            name: principal.name,
            is_active: principal.is_active,
            role_id: principal.role_id,
            extended_role: principal.extended_role,
        },
        role: snapshot.role,
        is_super_admin,
        permissions: snapshot.effective,
    })
}

/// Resolved role and effective permissions of the caller
#[utoipa::path(
    get,
    path = "/me/permissions",
    tag = "Me",
    responses(
        (status = 200, description = "Effective permissions", body = MyPermissions),
        (status = 401, description = "Not signed in"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn my_permissions(session: AdminSession) -> AppResult<Json<MyPermissions>> {
    summarize(&session).map(Json)
}

/// Reload the caller's role and grants
#[utoipa::path(
    post,
    path = "/me/permissions/refresh",
    tag = "Me",
    responses(
        (status = 200, description = "Reloaded permissions", body = MyPermissions),
        (status = 401, description = "Not signed in"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn refresh_permissions(session: AdminSession) -> AppResult<Json<MyPermissions>> {
    session.access.refresh().await;
    summarize(&session).map(Json)
}

/// End the caller's session
#[utoipa::path(
    post,
    path = "/me/sign-out",
    tag = "Me",
    responses(
        (status = 204, description = "Session cleared"),
        (status = 401, description = "Not signed in"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn sign_out(State(state): State<AppState>, auth: AuthUser) -> StatusCode {
    if state.sessions.end(auth.user_id).await {
        tracing::info!(user_id = %auth.user_id, "signed out");
    }
    StatusCode::NO_CONTENT
}

/// Navigation entries the caller may open
#[utoipa::path(
    get,
    path = "/me/menu",
    tag = "Me",
    responses(
        (status = 200, description = "Menu visibility", body = MenuResponse),
        (status = 401, description = "Not signed in"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn my_menu(session: AdminSession) -> AppResult<Json<MenuResponse>> {
    let menu = MenuVisibility::new(session.access.clone());
    let entries = menu
        .current()
        .iter()
        .map(|(key, visible)| (key.to_string(), *visible))
        .collect();

    Ok(Json(MenuResponse { entries }))
}

/// Check a single resource/action pair. Unknown names are reported as denied.
#[utoipa::path(
    get,
    path = "/me/check",
    tag = "Me",
    params(CheckQuery),
    responses(
        (status = 200, description = "Check result", body = CheckResponse),
        (status = 401, description = "Not signed in"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn check_permission(session: AdminSession, Query(query): Query<CheckQuery>) -> AppResult<Json<CheckResponse>> {
    let action = query.action.as_deref().unwrap_or("view");
    let allowed = session.access.has_permission_key(&query.resource, action);

    Ok(Json(CheckResponse {
        permission_key: format!("{}:{}", query.resource, action),
        allowed,
    }))
}
