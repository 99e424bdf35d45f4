use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};

use crate::authz;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::me::my_permissions,
        routes::me::refresh_permissions,
        routes::me::sign_out,
        routes::me::my_menu,
        routes::me::check_permission,
        routes::roles::list_roles,
        routes::roles::create_role,
        routes::roles::get_role,
        routes::roles::update_role,
        routes::roles::delete_role,
        routes::roles::user_count,
        routes::roles::permission_catalog
    ),
    components(
        schemas(
            authz::Resource,
            authz::Action,
            authz::Effect,
            authz::PermissionSource,
            authz::EffectivePermission,
            authz::ExtendedRole,
            authz::Role,
            authz::RolePermission,
            models::rbac::RoleCreateRequest,
            models::rbac::RoleUpdateRequest,
            models::rbac::UserCountResponse,
            models::rbac::CatalogEntry,
            models::rbac::PrincipalSummary,
            models::rbac::MyPermissions,
            models::rbac::MenuResponse,
            models::rbac::CheckResponse,
            routes::health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Me", description = "Permissions of the signed-in user"),
        (name = "Roles", description = "Role editor")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

pub fn build_openapi(port: u16) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(format!("http://localhost:{port}"))]);
    doc
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(build_openapi(crate::config::app_port()))
}
