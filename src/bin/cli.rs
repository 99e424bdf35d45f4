use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use uuid::Uuid;

use portal_authz::authz::{AccessControl, Action, AdminUser, DirectoryLoader, MenuVisibility, Resource};
use portal_authz::config::AuthzConfig;
use portal_authz::directory::{Directory, DirectorySeed};
use portal_authz::jwt::JwtConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "portal-authz developer tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mint a bearer token for a user id
    Token { user_id: Uuid },
    /// List the roles in the directory
    Roles,
    /// Evaluate a resource/action pair against a role
    Check {
        role_id: String,
        resource: String,
        #[arg(default_value = "view")]
        action: String,
    },
    /// Print the navigation visibility for a user
    Menu { user_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Token { user_id } => {
            let jwt = JwtConfig::from_env()?;
            println!("{}", jwt.encode(user_id)?);
        }
        Commands::Roles => {
            let directory = load_directory()?;
            for role in directory.list_roles().await {
                let kind = if role.is_superuser() {
                    "superuser"
                } else if role.is_system {
                    "system"
                } else {
                    "custom"
                };
                println!("{:<24} {:<16} {:<10} {}", role.id, role.code, kind, role.name);
            }
        }
        Commands::Check { role_id, resource, action } => {
            let directory = Arc::new(load_directory()?);
            directory
                .get_role(&role_id)
                .await
                .with_context(|| format!("unknown role {role_id}"))?;

            let resource: Resource = resource.parse()?;
            let action: Action = action.parse()?;
            let probe = AdminUser::new(Uuid::new_v4(), "cli", role_id.clone());

            let access = AccessControl::new(DirectoryLoader::new(directory));
            access.set_principal(Some(probe)).await?;

            let verdict = if access.has_permission(resource, action) { "allow" } else { "deny" };
            println!("{role_id} {resource}:{action} -> {verdict}");
        }
        Commands::Menu { user_id } => {
            let directory = Arc::new(load_directory()?);
            let principal = directory
                .principal(user_id)
                .await
                .with_context(|| format!("unknown user {user_id}"))?;

            let access = AccessControl::new(DirectoryLoader::new(directory));
            access.set_principal(Some(principal)).await?;

            let menu = MenuVisibility::new(access);
            for (key, visible) in menu.current().iter() {
                println!("{:<20} {}", key, if *visible { "shown" } else { "hidden" });
            }
        }
    }

    Ok(())
}

fn load_directory() -> anyhow::Result<Directory> {
    let config = AuthzConfig::from_env()?;
    let seed = match config.seed_file {
        Some(path) => DirectorySeed::from_file(path)?,
        None => DirectorySeed::builtin(),
    };
    Ok(Directory::new(seed))
}
