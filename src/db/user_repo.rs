use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::entities::{prelude::User, user};
use super::pagination::{PaginatedResponse, fetch_page};
use super::store::{StoreError, StoreResult};

const ENTITY: &str = "user";

/// Fields needed to insert a user. The password is already a digest here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub username: Option<String>,
    pub active: bool,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
}

impl NewUser {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            username: None,
            active: true,
            confirmed_at: None,
        }
    }
}

/// Changes applied to an existing user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<Option<String>>,
    pub active: Option<bool>,
    pub confirmed_at: Option<Option<DateTimeWithTimeZone>>,
    pub password_hash: Option<String>,
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> StoreResult<Option<user::Model>> {
    Ok(User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> StoreResult<Option<user::Model>> {
    Ok(User::find_by_id(id).one(db).await?)
}

pub async fn require<C: ConnectionTrait>(db: &C, id: Uuid) -> StoreResult<user::Model> {
    find_by_id(db, id)
        .await?
        .ok_or(StoreError::NotFound { entity: ENTITY, id })
}

pub async fn insert<C: ConnectionTrait>(db: &C, new_user: NewUser) -> StoreResult<user::Model> {
    if find_by_email(db, &new_user.email).await?.is_some() {
        return Err(duplicate_email(&new_user.email));
    }

    let now = Utc::now().fixed_offset();
    let email = new_user.email.clone();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(new_user.email),
        username: Set(new_user.username),
        password_hash: Set(new_user.password_hash),
        active: Set(new_user.active),
        confirmed_at: Set(new_user.confirmed_at),
        last_login_at: Set(None),
        current_login_at: Set(None),
        last_login_ip: Set(None),
        current_login_ip: Set(None),
        login_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model
        .insert(db)
        .await
        .map_err(|err| StoreError::from_write(ENTITY, "email", &email, err))
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    changes: UserChanges,
) -> StoreResult<user::Model> {
    let existing = require(db, id).await?;
    if let Some(email) = changes.email.as_deref()
        && let Some(other) = find_by_email(db, email).await?
        && other.id != id
    {
        return Err(duplicate_email(email));
    }

    let email = changes.email.clone().unwrap_or_else(|| existing.email.clone());
    let mut active: user::ActiveModel = existing.into();
    if let Some(value) = changes.email {
        active.email = Set(value);
    }
    if let Some(value) = changes.username {
        active.username = Set(value);
    }
    if let Some(value) = changes.active {
        active.active = Set(value);
    }
    if let Some(value) = changes.confirmed_at {
        active.confirmed_at = Set(value);
    }
    if let Some(value) = changes.password_hash {
        active.password_hash = Set(value);
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    active
        .update(db)
        .await
        .map_err(|err| StoreError::from_write(ENTITY, "email", &email, err))
}

/// Moves the current login into the `last_*` fields, stamps the new one and
/// bumps the counter.
pub async fn record_login<C: ConnectionTrait>(
    db: &C,
    existing: user::Model,
    ip: Option<String>,
    at: DateTimeWithTimeZone,
) -> StoreResult<user::Model> {
    let previous_at = existing.current_login_at;
    let previous_ip = existing.current_login_ip.clone();
    let count = existing.login_count.saturating_add(1);

    let mut active: user::ActiveModel = existing.into();
    active.last_login_at = Set(previous_at.or(Some(at)));
    active.last_login_ip = Set(previous_ip.or_else(|| ip.clone()));
    active.current_login_at = Set(Some(at));
    active.current_login_ip = Set(ip);
    active.login_count = Set(count);
    active.updated_at = Set(Utc::now().fixed_offset());
    Ok(active.update(db).await?)
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> StoreResult<()> {
    let result = User::delete_by_id(id)
        .exec(db)
        .await
        .map_err(|err| StoreError::from_write(ENTITY, "id", &id.to_string(), err))?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    Ok(())
}

pub async fn list<C: ConnectionTrait>(
    db: &C,
    page: u64,
    page_size: u64,
) -> StoreResult<PaginatedResponse<user::Model>> {
    let select = User::find().order_by_asc(user::Column::Email);
    fetch_page(db, select, page, page_size).await
}

pub async fn count<C: ConnectionTrait>(db: &C) -> StoreResult<u64> {
    Ok(User::find().count(db).await?)
}

fn duplicate_email(email: &str) -> StoreError {
    StoreError::DuplicateKey {
        entity: ENTITY,
        field: "email",
        value: email.to_string(),
    }
}
