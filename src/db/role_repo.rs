use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::{prelude::Role, role};
use super::pagination::{PaginatedResponse, fetch_page};
use super::store::{StoreError, StoreResult};

const ENTITY: &str = "role";

pub async fn find_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> StoreResult<Option<role::Model>> {
    Ok(Role::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?)
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> StoreResult<Option<role::Model>> {
    Ok(Role::find_by_id(id).one(db).await?)
}

pub async fn require<C: ConnectionTrait>(db: &C, id: Uuid) -> StoreResult<role::Model> {
    find_by_id(db, id)
        .await?
        .ok_or(StoreError::NotFound { entity: ENTITY, id })
}

pub async fn find_by_ids<C: ConnectionTrait>(
    db: &C,
    ids: &[Uuid],
) -> StoreResult<Vec<role::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(Role::find()
        .filter(role::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(role::Column::Name)
        .all(db)
        .await?)
}

/// Inserts a role, refusing names that are already taken.
pub async fn insert<C: ConnectionTrait>(
    db: &C,
    name: &str,
    description: Option<&str>,
) -> StoreResult<role::Model> {
    if find_by_name(db, name).await?.is_some() {
        return Err(duplicate_name(name));
    }

    let now = Utc::now().fixed_offset();
    let model = role::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model
        .insert(db)
        .await
        .map_err(|err| StoreError::from_write(ENTITY, "name", name, err))
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    name: &str,
    description: Option<&str>,
) -> StoreResult<role::Model> {
    let existing = require(db, id).await?;
    if let Some(other) = find_by_name(db, name).await?
        && other.id != id
    {
        return Err(duplicate_name(name));
    }

    let mut active: role::ActiveModel = existing.into();
    active.name = Set(name.to_string());
    active.description = Set(description.map(str::to_string));
    active.updated_at = Set(Utc::now().fixed_offset());
    active
        .update(db)
        .await
        .map_err(|err| StoreError::from_write(ENTITY, "name", name, err))
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> StoreResult<()> {
    let result = Role::delete_by_id(id)
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
) -> StoreResult<PaginatedResponse<role::Model>> {
    let select = Role::find().order_by_asc(role::Column::Name);
    fetch_page(db, select, page, page_size).await
}

pub async fn count<C: ConnectionTrait>(db: &C) -> StoreResult<u64> {
    Ok(Role::find().count(db).await?)
}

fn duplicate_name(name: &str) -> StoreError {
    StoreError::DuplicateKey {
        entity: ENTITY,
        field: "name",
        value: name.to_string(),
    }
}
