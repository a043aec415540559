use std::sync::Arc;

use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{project_name, render};
use crate::{
    auth::{AdminAccess, RequireAdminLayer},
    db::pagination::{DEFAULT_PAGE_SIZE, PaginatedResponse},
    response::{ApiResult, JsonApiResponse},
    services::admin_service::{self, RoleForm, RoleView, UserForm, UserView},
    state::AppState,
};

#[derive(Template)]
#[template(path = "admin/index.html")]
struct DashboardTemplate {
    project_name: String,
    identity: String,
    admin_role: String,
    users: u64,
    roles: u64,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageQuery {
    fn resolve(&self) -> (u64, u64) {
        (
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// Every route here sits behind the admin gate.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/users", get(list_users).post(create_user))
        .route(
            "/admin/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/admin/roles", get(list_roles).post(create_role))
        .route(
            "/admin/roles/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route_layer(RequireAdminLayer::new(state.clone()))
        .with_state(state)
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
) -> Result<Html<String>, Response> {
    let counts = admin_service::dashboard(&state.store, &access)
        .await
        .map_err(IntoResponse::into_response)?;
    let template = DashboardTemplate {
        project_name: project_name(),
        identity: access.identity().to_string(),
        admin_role: state.gate.admin_role().to_string(),
        users: counts.users,
        roles: counts.roles,
    };
    render(&template, "admin dashboard").map_err(IntoResponse::into_response)
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<UserView>> {
    let (page, page_size) = query.resolve();
    JsonApiResponse::ok(admin_service::list_users(&state.store, &access, page, page_size).await?)
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Path(id): Path<Uuid>,
) -> ApiResult<UserView> {
    JsonApiResponse::ok(admin_service::get_user(&state.store, &access, id).await?)
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Json(form): Json<UserForm>,
) -> ApiResult<UserView> {
    JsonApiResponse::created(admin_service::create_user(&state.store, &access, form).await?)
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Path(id): Path<Uuid>,
    Json(form): Json<UserForm>,
) -> ApiResult<UserView> {
    JsonApiResponse::ok(admin_service::update_user(&state.store, &access, id, form).await?)
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Path(id): Path<Uuid>,
) -> ApiResult<Deleted> {
    admin_service::delete_user(&state.store, &access, id).await?;
    JsonApiResponse::ok(Deleted { id })
}

async fn list_roles(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<RoleView>> {
    let (page, page_size) = query.resolve();
    JsonApiResponse::ok(admin_service::list_roles(&state.store, &access, page, page_size).await?)
}

async fn get_role(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Path(id): Path<Uuid>,
) -> ApiResult<RoleView> {
    JsonApiResponse::ok(admin_service::get_role(&state.store, &access, id).await?)
}

async fn create_role(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Json(form): Json<RoleForm>,
) -> ApiResult<RoleView> {
    JsonApiResponse::created(admin_service::create_role(&state.store, &access, form).await?)
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Path(id): Path<Uuid>,
    Json(form): Json<RoleForm>,
) -> ApiResult<RoleView> {
    JsonApiResponse::ok(admin_service::update_role(&state.store, &access, id, form).await?)
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    access: AdminAccess,
    Path(id): Path<Uuid>,
) -> ApiResult<Deleted> {
    admin_service::delete_role(&state.store, &access, id).await?;
    JsonApiResponse::ok(Deleted { id })
}
