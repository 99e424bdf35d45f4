use std::fs;

fn main() -> anyhow::Result<()> {
    let doc = portal_authz::docs::build_openapi(portal_authz::config::app_port());
    let s = serde_json::to_string_pretty(&doc)?;
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    fs::write(&path, s)?;
    println!("wrote {}", path);
    Ok(())
}
