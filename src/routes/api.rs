use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::{Deserialize, Serialize};

use super::session::ClientIp;
use crate::{
    response::{ApiResult, JsonApiResponse},
    services::login_service::TokenBundle,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/version", get(version))
        .route("/api/login", post(login))
        .with_state(state)
}

async fn version() -> ApiResult<VersionInfo> {
    JsonApiResponse::ok(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(body): Json<LoginRequest>,
) -> ApiResult<TokenBundle> {
    let outcome = state.login.login(&body.email, &body.password, ip).await?;
    JsonApiResponse::ok(outcome.tokens)
}
