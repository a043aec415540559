//! Administrative CRUD over users and roles.
//!
//! Every operation takes an [`AdminAccess`], which only the admin gate can
//! hand out. Forms never carry a password digest and views never expose one.

use chrono::{DateTime, FixedOffset};
use sea_orm::DatabaseTransaction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AdminAccess, password::hash_password},
    db::{
        IdentityStore, StoreError,
        entities::{role, user},
        pagination::PaginatedResponse,
        role_repo, roles_users_repo,
        store::{delete_role_in, delete_user_in, set_user_roles_in},
        user_repo::{self, NewUser, UserChanges},
    },
    error::AppError,
};

const MAX_ROLE_NAME_LEN: usize = 80;
const MAX_DESCRIPTION_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 255;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
    pub email: String,
    /// Left unchanged on update when absent; blank clears it.
    #[serde(default)]
    pub username: Option<String>,
    /// Left unchanged on update when absent; new users default to active.
    #[serde(default)]
    pub active: Option<bool>,
    /// Empty or absent keeps the stored password on update.
    #[serde(default)]
    pub new_password: Option<String>,
    /// When present, replaces the user's roles with exactly these ids.
    #[serde(default)]
    pub roles: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub active: bool,
    pub confirmed_at: Option<DateTime<FixedOffset>>,
    pub last_login_at: Option<DateTime<FixedOffset>>,
    pub current_login_at: Option<DateTime<FixedOffset>>,
    pub last_login_ip: Option<String>,
    pub current_login_ip: Option<String>,
    pub login_count: i32,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub roles: Vec<RoleSummary>,
}

impl UserView {
    pub fn new(user: user::Model, roles: &[role::Model]) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            active: user.active,
            confirmed_at: user.confirmed_at,
            last_login_at: user.last_login_at,
            current_login_at: user.current_login_at,
            last_login_ip: user.last_login_ip,
            current_login_ip: user.current_login_ip,
            login_count: user.login_count,
            created_at: user.created_at,
            updated_at: user.updated_at,
            roles: roles
                .iter()
                .map(|role| RoleSummary {
                    id: role.id,
                    name: role.name.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<role::Model> for RoleView {
    fn from(role: role::Model) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardCounts {
    pub users: u64,
    pub roles: u64,
}

pub async fn dashboard(store: &IdentityStore, _access: &AdminAccess) -> Result<DashboardCounts, AppError> {
    Ok(DashboardCounts {
        users: store.count_users().await?,
        roles: store.count_roles().await?,
    })
}

pub async fn list_users(
    store: &IdentityStore,
    _access: &AdminAccess,
    page: u64,
    page_size: u64,
) -> Result<PaginatedResponse<UserView>, AppError> {
    let users = store.list_users(page, page_size).await?;
    let mut views = Vec::with_capacity(users.data.len());
    for user in users.data {
        let roles = store.roles_for_user(user.id).await?;
        views.push(UserView::new(user, &roles));
    }
    Ok(PaginatedResponse {
        data: views,
        page: users.page,
        page_size: users.page_size,
        has_next: users.has_next,
    })
}

pub async fn get_user(
    store: &IdentityStore,
    _access: &AdminAccess,
    id: Uuid,
) -> Result<UserView, AppError> {
    let (user, roles) = store
        .user_with_roles(id)
        .await?
        .ok_or(StoreError::NotFound { entity: "user", id })?;
    Ok(UserView::new(user, &roles))
}

pub async fn create_user(
    store: &IdentityStore,
    access: &AdminAccess,
    form: UserForm,
) -> Result<UserView, AppError> {
    let email = normalize_email(&form.email)?;
    let password = form
        .new_password
        .as_deref()
        .filter(|password| !password.is_empty())
        .ok_or_else(|| AppError::bad_request("A password is required for new users"))?;
    let password_hash = hash_password(password)?;

    let txn = begin(store).await?;
    let new_user = NewUser {
        username: normalize_username(form.username),
        active: form.active.unwrap_or(true),
        ..NewUser::new(email, password_hash)
    };
    let user = user_repo::insert(&txn, new_user).await?;
    if let Some(role_ids) = form.roles.as_deref() {
        set_user_roles_in(&txn, user.id, role_ids).await?;
    }
    let roles = roles_users_repo::roles_for_user(&txn, user.id).await?;
    commit(txn).await?;

    tracing::info!(admin = access.identity(), user = %user.id, "user created");
    Ok(UserView::new(user, &roles))
}

pub async fn update_user(
    store: &IdentityStore,
    access: &AdminAccess,
    id: Uuid,
    form: UserForm,
) -> Result<UserView, AppError> {
    let email = normalize_email(&form.email)?;
    let password_hash = match form.new_password.as_deref() {
        Some(password) if !password.is_empty() => Some(hash_password(password)?),
        _ => None,
    };
    let password_changed = password_hash.is_some();

    let txn = begin(store).await?;
    let changes = UserChanges {
        email: Some(email),
        username: form.username.map(|name| normalize_username(Some(name))),
        active: form.active,
        confirmed_at: None,
        password_hash,
    };
    let user = user_repo::update(&txn, id, changes).await?;
    if let Some(role_ids) = form.roles.as_deref() {
        set_user_roles_in(&txn, user.id, role_ids).await?;
    }
    let roles = roles_users_repo::roles_for_user(&txn, user.id).await?;
    commit(txn).await?;

    tracing::info!(admin = access.identity(), user = %id, password_changed, "user updated");
    Ok(UserView::new(user, &roles))
}

pub async fn delete_user(store: &IdentityStore, access: &AdminAccess, id: Uuid) -> Result<(), AppError> {
    let txn = begin(store).await?;
    delete_user_in(&txn, id).await?;
    commit(txn).await?;

    tracing::info!(admin = access.identity(), user = %id, "user deleted");
    Ok(())
}

pub async fn list_roles(
    store: &IdentityStore,
    _access: &AdminAccess,
    page: u64,
    page_size: u64,
) -> Result<PaginatedResponse<RoleView>, AppError> {
    Ok(store.list_roles(page, page_size).await?.map(RoleView::from))
}

pub async fn get_role(store: &IdentityStore, _access: &AdminAccess, id: Uuid) -> Result<RoleView, AppError> {
    Ok(store.get_role(id).await?.into())
}

pub async fn create_role(
    store: &IdentityStore,
    access: &AdminAccess,
    form: RoleForm,
) -> Result<RoleView, AppError> {
    let (name, description) = validate_role_form(form)?;
    let role = store.create_role(&name, description.as_deref()).await?;

    tracing::info!(admin = access.identity(), role = %role.name, "role created");
    Ok(role.into())
}

pub async fn update_role(
    store: &IdentityStore,
    access: &AdminAccess,
    id: Uuid,
    form: RoleForm,
) -> Result<RoleView, AppError> {
    let (name, description) = validate_role_form(form)?;
    let txn = begin(store).await?;
    let role = role_repo::update(&txn, id, &name, description.as_deref()).await?;
    commit(txn).await?;

    tracing::info!(admin = access.identity(), role = %role.name, "role updated");
    Ok(role.into())
}

pub async fn delete_role(store: &IdentityStore, access: &AdminAccess, id: Uuid) -> Result<(), AppError> {
    let txn = begin(store).await?;
    delete_role_in(&txn, id).await?;
    commit(txn).await?;

    tracing::info!(admin = access.identity(), role = %id, "role deleted");
    Ok(())
}

async fn begin(store: &IdentityStore) -> Result<DatabaseTransaction, AppError> {
    Ok(store.begin().await?)
}

async fn commit(txn: DatabaseTransaction) -> Result<(), AppError> {
    Ok(txn.commit().await.map_err(StoreError::from)?)
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.len() > MAX_EMAIL_LEN {
        return Err(AppError::bad_request("A valid email is required"));
    }
    Ok(email.to_string())
}

fn normalize_username(username: Option<String>) -> Option<String> {
    username
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn validate_role_form(form: RoleForm) -> Result<(String, Option<String>), AppError> {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("Role name is required"));
    }
    if name.chars().count() > MAX_ROLE_NAME_LEN {
        return Err(AppError::bad_request(format!(
            "Role name must be at most {MAX_ROLE_NAME_LEN} characters"
        )));
    }

    let description = form
        .description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    if description
        .as_deref()
        .is_some_and(|text| text.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(AppError::bad_request(format!(
            "Role description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok((name, description))
}
