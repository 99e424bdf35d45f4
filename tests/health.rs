use std::sync::Arc;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

use portal_authz::create_app;
use portal_authz::directory::{Directory, DirectorySeed};

#[tokio::test]
async fn health_endpoint_reports_directory() -> Result<()> {
    std::env::set_var("JWT_SECRET", "test-secret");
    let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
    let app = create_app(directory).await?;

    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())?;

    let resp: Response = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK, "health endpoint did not return 200");

    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let v: Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(v["status"], "ok");
    assert_eq!(v["roles"], 4, "unexpected body: {}", v);
    assert_eq!(v["sessions"], 0);

    Ok(())
}
