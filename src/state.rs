use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    auth::{AdminGate, jwt::JwtKeys},
    config::AppConfig,
    db::IdentityStore,
    services::login_service::LoginService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub jwt: JwtKeys,
    pub store: IdentityStore,
    pub gate: AdminGate,
    pub login: LoginService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Arc<Self> {
        let jwt = JwtKeys::from_secret(config.secret_key.as_bytes());
        let store = IdentityStore::new(db);
        Arc::new(Self {
            login: LoginService::new(store.clone(), jwt.clone(), config.session_ttl_secs),
            gate: AdminGate::new(config.admin_user.clone()),
            jwt,
            store,
            config,
        })
    }
}
