use std::sync::Arc;

use axum::Router;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::{
    config::AppConfig,
    db::connection,
    routes::app,
    seed::{AdminSeed, seed_admin},
    state::AppState,
};

pub const TEST_ADMIN_EMAIL: &str = "admin@example.com";
pub const TEST_ADMIN_PASSWORD: &str = "admin-password";
pub const TEST_ADMIN_ROLE: &str = "admin";

/// Fresh in-memory SQLite database with the schema applied. A single pooled
/// connection keeps every query on the same database.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("connect in-memory database");
    connection::prepare(&db).await.expect("prepare database");
    connection::sync_schema(&db).await.expect("sync schema");
    db
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        secret_key: "test-secret".to_string(),
        admin_email: TEST_ADMIN_EMAIL.to_string(),
        admin_password: TEST_ADMIN_PASSWORD.to_string(),
        admin_user: TEST_ADMIN_ROLE.to_string(),
        session_ttl_secs: 600,
        ..AppConfig::default()
    }
}

/// State over a fresh database that already holds the seeded admin.
pub async fn test_state() -> Arc<AppState> {
    let cfg = test_config();
    let state = AppState::new(cfg.clone(), test_db().await);
    seed_admin(&state.store, AdminSeed::from_config(&cfg))
        .await
        .expect("seed admin");
    state
}

pub fn test_router(state: Arc<AppState>) -> Router {
    app(state)
}
