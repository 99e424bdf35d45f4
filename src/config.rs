use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Authorization settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzConfig {
    pub login_path: String,
    pub home_path: String,
    pub load_timeout: Option<Duration>,
    pub seed_file: Option<PathBuf>,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            load_timeout: None,
            seed_file: None,
        }
    }
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let load_timeout = match std::env::var("AUTHZ_LOAD_TIMEOUT_MS") {
            Ok(raw) => Some(Duration::from_millis(raw.parse::<u64>().map_err(|_| {
                AppError::configuration("AUTHZ_LOAD_TIMEOUT_MS must be a valid integer")
            })?)),
            Err(_) => None,
        };

        Ok(Self {
            login_path: std::env::var("AUTHZ_LOGIN_PATH").unwrap_or(defaults.login_path),
            home_path: std::env::var("AUTHZ_HOME_PATH").unwrap_or(defaults.home_path),
            load_timeout,
            seed_file: std::env::var("AUTHZ_SEED_FILE").ok().map(PathBuf::from),
        })
    }
}

pub fn app_port() -> u16 {
    std::env::var("APP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000)
}
