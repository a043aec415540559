use std::collections::BTreeSet;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use super::entities::{prelude::RolesUsers, role, roles_users};
use super::role_repo;
use super::store::{StoreError, StoreResult};

const ENTITY: &str = "roles_users";

pub async fn exists<C: ConnectionTrait>(db: &C, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
    Ok(RolesUsers::find_by_id((user_id, role_id))
        .one(db)
        .await?
        .is_some())
}

/// Links a user to a role. Returns `false` when the pair was already linked.
pub async fn link<C: ConnectionTrait>(db: &C, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
    if exists(db, user_id, role_id).await? {
        return Ok(false);
    }

    let model = roles_users::ActiveModel {
        user_id: Set(user_id),
        role_id: Set(role_id),
        ..Default::default()
    };
    RolesUsers::insert(model)
        .exec_without_returning(db)
        .await
        .map_err(|err| {
            StoreError::from_write(ENTITY, "user_id,role_id", &format!("{user_id},{role_id}"), err)
        })?;
    Ok(true)
}

pub async fn unlink<C: ConnectionTrait>(db: &C, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
    let result = RolesUsers::delete_by_id((user_id, role_id)).exec(db).await?;
    Ok(result.rows_affected > 0)
}

pub async fn roles_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> StoreResult<Vec<role::Model>> {
    let role_ids: Vec<Uuid> = RolesUsers::find()
        .filter(roles_users::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.role_id)
        .collect();
    role_repo::find_by_ids(db, &role_ids).await
}

pub async fn count_for_role<C: ConnectionTrait>(db: &C, role_id: Uuid) -> StoreResult<u64> {
    Ok(RolesUsers::find()
        .filter(roles_users::Column::RoleId.eq(role_id))
        .count(db)
        .await?)
}

pub async fn delete_for_user<C: ConnectionTrait>(db: &C, user_id: Uuid) -> StoreResult<u64> {
    let result = RolesUsers::delete_many()
        .filter(roles_users::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Replaces the user's links with exactly `role_ids`. Duplicate ids collapse
/// into one link.
pub async fn replace_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    role_ids: &[Uuid],
) -> StoreResult<()> {
    delete_for_user(db, user_id).await?;
    let unique: BTreeSet<Uuid> = role_ids.iter().copied().collect();
    for role_id in unique {
        link(db, user_id, role_id).await?;
    }
    Ok(())
}
