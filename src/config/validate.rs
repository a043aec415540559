use anyhow::{Result, bail};

use super::AppConfig;
use crate::auth::password::MIN_PASSWORD_LEN;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.host.trim().is_empty() {
        errors.push("host must not be empty".to_string());
    }

    if cfg.database_url.trim().is_empty() {
        errors.push("database_url must not be empty".to_string());
    }

    if cfg.db_max_connections == 0 {
        errors.push("db_max_connections must be > 0".to_string());
    }

    if cfg.db_min_idle > cfg.db_max_connections {
        errors.push(format!(
            "db_min_idle ({}) must be <= db_max_connections ({})",
            cfg.db_min_idle, cfg.db_max_connections
        ));
    }

    if cfg.secret_key.trim().is_empty() {
        errors.push("secret_key must not be empty".to_string());
    }

    if cfg.session_ttl_secs == 0 {
        errors.push("session_ttl_secs must be > 0".to_string());
    }

    if cfg.admin_email.trim().is_empty() {
        errors.push("admin_email must not be empty".to_string());
    }

    if cfg.admin_password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "admin_password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }

    if cfg.admin_user.trim().is_empty() {
        errors.push("admin_user must not be empty".to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}
