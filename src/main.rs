use std::sync::Arc;

use portal_authz::config::{app_port, AuthzConfig};
use portal_authz::directory::{Directory, DirectorySeed};
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let authz = AuthzConfig::from_env()?;
    let seed = match &authz.seed_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading directory seed");
            DirectorySeed::from_file(path)?
        }
        None => {
            tracing::warn!("AUTHZ_SEED_FILE not set, using built-in demo directory");
            DirectorySeed::builtin()
        }
    };

    let directory = Arc::new(Directory::new(seed));
    let app = portal_authz::create_app(directory).await?;

    // Swagger UI fetches the document served by the router
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .persist_authorization(true);
    let app = app.merge(SwaggerUi::new("/docs").config(swagger_config));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], app_port()));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
