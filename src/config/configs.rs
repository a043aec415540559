use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{defaults, loader::ConfigSources, validate};

/// Runtime settings. Every key can come from the instance file, the file
/// named by `APP_CONFIG_FILE`, or an upper-case environment variable of the
/// same name (`ADMIN_EMAIL`, `DATABASE_URL`, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_idle: u32,
    pub secret_key: String,
    pub session_ttl_secs: u64,
    pub admin_email: String,
    pub admin_password: String,
    /// Name of the role that grants access to `/admin`.
    pub admin_user: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let dev = cfg!(debug_assertions);
        let dev_only = |value: &str| if dev { value.to_string() } else { String::new() };

        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
            database_url: dev_only(defaults::DEFAULT_DEV_DATABASE_URL),
            db_max_connections: defaults::DEFAULT_DB_MAX_CONNECTIONS,
            db_min_idle: defaults::DEFAULT_DB_MIN_IDLE,
            secret_key: dev_only(defaults::DEFAULT_DEV_SECRET_KEY),
            session_ttl_secs: defaults::DEFAULT_SESSION_TTL_SECS,
            admin_email: dev_only(defaults::DEFAULT_DEV_ADMIN_EMAIL),
            admin_password: dev_only(defaults::DEFAULT_DEV_ADMIN_PASSWORD),
            admin_user: defaults::DEFAULT_ADMIN_ROLE.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        ConfigSources::from_process_env().load()
    }

    pub fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}
