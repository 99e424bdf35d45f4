use std::sync::Arc;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use portal_authz::create_app;
use portal_authz::directory::{Directory, DirectorySeed, DEMO_ADMIN_ID, DEMO_SUPER_ADMIN_ID};
use portal_authz::jwt::JwtConfig;

async fn setup() -> Result<(Router, String, String)> {
    std::env::set_var("JWT_SECRET", "test-secret");
    let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
    let app = create_app(directory).await?;
    let jwt = JwtConfig::new("test-secret", 1);
    Ok((app, jwt.encode(DEMO_SUPER_ADMIN_ID)?, jwt.encode(DEMO_ADMIN_ID)?))
}

async fn send(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}

#[tokio::test]
async fn admin_can_view_but_not_edit_roles() -> Result<()> {
    let (app, _, admin) = setup().await?;

    let (status, roles) = send(&app, "GET", "/roles", &admin, None).await?;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = roles
        .as_array()
        .expect("roles array")
        .iter()
        .filter_map(|r| r["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["SUPER_ADMIN", "ADMIN", "SALES", "VIEWER"]);

    let body = json!({ "code": "WAREHOUSE", "name": "Warehouse" });
    let (status, v) = send(&app, "POST", "/roles", &admin, Some(body)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "unexpected body: {}", v);
    assert_eq!(v["error"], "access_denied");
    assert_eq!(v["message"], "access denied: Roles & Permissions");
    assert_eq!(v["redirect"], "/");

    let (status, _) = send(&app, "DELETE", "/roles/role-viewer", &admin, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn super_admin_manages_custom_roles() -> Result<()> {
    let (app, owner, _) = setup().await?;

    let body = json!({
        "code": "WAREHOUSE",
        "name": "Warehouse",
        "sort_order": 10,
        "permissions": [
            { "resource": "inventory", "actions": ["view", "edit"] },
            { "resource": "products", "actions": ["view"] }
        ]
    });
    let (status, created) = send(&app, "POST", "/roles", &owner, Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", created);
    let id = created["id"].as_str().expect("role id").to_string();
    assert_eq!(created["is_system"], false);
    assert_eq!(created["is_active"], true);

    let (status, fetched) = send(&app, "GET", &format!("/roles/{id}"), &owner, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["code"], "WAREHOUSE");

    let update = json!({ "name": "Warehouse team", "permissions": [{ "resource": "inventory", "actions": ["view"] }] });
    let (status, updated) = send(&app, "PUT", &format!("/roles/{id}"), &owner, Some(update)).await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", updated);
    assert_eq!(updated["name"], "Warehouse team");
    assert_eq!(updated["permissions"].as_array().map(Vec::len), Some(1));

    let (status, count) = send(&app, "GET", &format!("/roles/{id}/user-count"), &owner, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["user_count"], 0);

    let (status, _) = send(&app, "DELETE", &format!("/roles/{id}"), &owner, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/roles/{id}"), &owner, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn role_editor_rejects_invalid_changes() -> Result<()> {
    let (app, owner, _) = setup().await?;

    let (status, _) = send(&app, "DELETE", "/roles/role-admin", &owner, None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", "/roles/role-missing", &owner, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let duplicate = json!({ "code": "ADMIN", "name": "Another admin" });
    let (status, _) = send(&app, "POST", "/roles", &owner, Some(duplicate)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // dashboard only offers `view`
    let unsupported = json!({
        "code": "DASH",
        "name": "Dashboard editors",
        "permissions": [{ "resource": "dashboard", "actions": ["delete"] }]
    });
    let (status, v) = send(&app, "POST", "/roles", &owner, Some(unsupported)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected body: {}", v);

    Ok(())
}

#[tokio::test]
async fn role_edits_reach_signed_in_holders() -> Result<()> {
    let (app, owner, admin) = setup().await?;

    let check = "/me/check?resource=orders&action=approve";
    let (_, before) = send(&app, "GET", check, &admin, None).await?;
    assert_eq!(before["allowed"], false);

    let (_, role) = send(&app, "GET", "/roles/role-admin", &owner, None).await?;
    let mut permissions = role["permissions"].as_array().cloned().unwrap_or_default();
    permissions.push(json!({ "resource": "orders", "actions": ["view", "approve"] }));

    let update = json!({ "permissions": permissions });
    let (status, v) = send(&app, "PUT", "/roles/role-admin", &owner, Some(update)).await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", v);

    let (_, after) = send(&app, "GET", check, &admin, None).await?;
    assert_eq!(after["allowed"], true);

    Ok(())
}

#[tokio::test]
async fn catalog_lists_every_resource() -> Result<()> {
    let (app, _, admin) = setup().await?;

    let (status, catalog) = send(&app, "GET", "/permissions/catalog", &admin, None).await?;
    assert_eq!(status, StatusCode::OK);
    let entries = catalog.as_array().expect("catalog array");
    assert_eq!(entries.len(), 18);

    let backup = entries
        .iter()
        .find(|e| e["resource"] == "settings_backup")
        .expect("settings_backup entry");
    assert_eq!(backup["display_name"], "Backup Settings");
    assert!(backup["actions"].as_array().expect("actions").contains(&json!("run_backup")));

    Ok(())
}
