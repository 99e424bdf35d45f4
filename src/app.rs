use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AuthzConfig;
use crate::docs;
use crate::directory::Directory;
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{health, me, roles};
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
    pub sessions: SessionRegistry,
    pub jwt: Arc<JwtConfig>,
    pub authz: Arc<AuthzConfig>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(directory: Arc<Directory>, jwt: JwtConfig, authz: AuthzConfig, event_bus: EventBus) -> Self {
        Self {
            sessions: SessionRegistry::new(directory.clone(), authz.load_timeout),
            directory,
            jwt: Arc::new(jwt),
            authz: Arc::new(authz),
            event_bus,
        }
    }
}

/// Builds the router from environment configuration.
pub async fn create_app(directory: Arc<Directory>) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let authz = AuthzConfig::from_env()?;

    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_activity_listener(rx));

    Ok(router(AppState::new(directory, jwt_config, authz, event_bus)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let me_routes = Router::new()
        .route("/permissions", get(me::my_permissions))
        .route("/permissions/refresh", post(me::refresh_permissions))
        .route("/sign-out", post(me::sign_out))
        .route("/menu", get(me::my_menu))
        .route("/check", get(me::check_permission));

    let role_routes = Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route("/:id", get(roles::get_role).put(roles::update_role).delete(roles::delete_role))
        .route("/:id/user-count", get(roles::user_count));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .route("/permissions/catalog", get(roles::permission_catalog))
        .nest("/me", me_routes)
        .nest("/roles", role_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
