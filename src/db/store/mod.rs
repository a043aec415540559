//! Users, roles and the links between them.
//!
//! `IdentityStore` is the handle the rest of the application receives. The
//! repo modules under `crate::db` expose the same operations generically over
//! any connection, so a caller that already holds a transaction uses those.

mod error;

pub use error::{StoreError, StoreResult};

use chrono::Utc;
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, SqliteTransactionMode, TransactionOptions,
    TransactionTrait, prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::entities::{role, user};
use super::pagination::PaginatedResponse;
use super::{role_repo, roles_users_repo, user_repo};
use super::user_repo::{NewUser, UserChanges};

#[derive(Clone)]
pub struct IdentityStore {
    db: DatabaseConnection,
}

impl IdentityStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn begin(&self) -> StoreResult<DatabaseTransaction> {
        Ok(self.db.begin().await?)
    }

    /// Starts a transaction that holds the write lock from `BEGIN` on SQLite,
    /// so concurrent writers queue on the busy timeout instead of failing
    /// when they upgrade a read lock. Other backends start a plain transaction.
    pub async fn begin_write(&self) -> StoreResult<DatabaseTransaction> {
        let options = TransactionOptions {
            sqlite_transaction_mode: Some(SqliteTransactionMode::Immediate),
            ..Default::default()
        };
        Ok(self.db.begin_with_options(options).await?)
    }

    pub async fn find_role(&self, name: &str) -> StoreResult<Option<role::Model>> {
        role_repo::find_by_name(&self.db, name).await
    }

    pub async fn get_role(&self, id: Uuid) -> StoreResult<role::Model> {
        role_repo::require(&self.db, id).await
    }

    pub async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<role::Model> {
        role_repo::insert(&self.db, name, description).await
    }

    pub async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<role::Model> {
        role_repo::update(&self.db, id, name, description).await
    }

    /// Deletes a role nobody holds. A role still linked to a user is refused
    /// and left in place.
    pub async fn delete_role(&self, id: Uuid) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        delete_role_in(&txn, id).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn list_roles(
        &self,
        page: u64,
        page_size: u64,
    ) -> StoreResult<PaginatedResponse<role::Model>> {
        role_repo::list(&self.db, page, page_size).await
    }

    pub async fn count_roles(&self) -> StoreResult<u64> {
        role_repo::count(&self.db).await
    }

    pub async fn get_user(&self, email: &str) -> StoreResult<Option<user::Model>> {
        user_repo::find_by_email(&self.db, email).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> StoreResult<user::Model> {
        user_repo::insert(&self.db, new_user).await
    }

    pub async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<user::Model> {
        user_repo::update(&self.db, id, changes).await
    }

    /// Deletes a user together with its role links.
    pub async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        delete_user_in(&txn, id).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn list_users(
        &self,
        page: u64,
        page_size: u64,
    ) -> StoreResult<PaginatedResponse<user::Model>> {
        user_repo::list(&self.db, page, page_size).await
    }

    pub async fn count_users(&self) -> StoreResult<u64> {
        user_repo::count(&self.db).await
    }

    pub async fn add_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
        user_repo::require(&self.db, user_id).await?;
        role_repo::require(&self.db, role_id).await?;
        roles_users_repo::link(&self.db, user_id, role_id).await
    }

    pub async fn remove_role_from_user(&self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
        roles_users_repo::unlink(&self.db, user_id, role_id).await
    }

    pub async fn roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<role::Model>> {
        roles_users_repo::roles_for_user(&self.db, user_id).await
    }

    pub async fn user_with_roles(
        &self,
        id: Uuid,
    ) -> StoreResult<Option<(user::Model, Vec<role::Model>)>> {
        let Some(user) = user_repo::find_by_id(&self.db, id).await? else {
            return Ok(None);
        };
        let roles = roles_users_repo::roles_for_user(&self.db, id).await?;
        Ok(Some((user, roles)))
    }

    pub async fn set_user_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        set_user_roles_in(&txn, user_id, role_ids).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn record_login(
        &self,
        user_id: Uuid,
        ip: Option<String>,
        at: Option<DateTimeWithTimeZone>,
    ) -> StoreResult<user::Model> {
        let txn = self.db.begin().await?;
        let existing = user_repo::require(&txn, user_id).await?;
        let at = at.unwrap_or_else(|| Utc::now().fixed_offset());
        let updated = user_repo::record_login(&txn, existing, ip, at).await?;
        txn.commit().await?;
        Ok(updated)
    }
}

pub async fn delete_role_in(txn: &DatabaseTransaction, id: Uuid) -> StoreResult<()> {
    let role = role_repo::require(txn, id).await?;
    let holders = roles_users_repo::count_for_role(txn, id).await?;
    if holders > 0 {
        return Err(StoreError::ReferentialIntegrity {
            entity: "role",
            detail: format!("role '{}' is assigned to {holders} user(s)", role.name),
        });
    }
    role_repo::delete(txn, id).await
}

pub async fn delete_user_in(txn: &DatabaseTransaction, id: Uuid) -> StoreResult<()> {
    user_repo::require(txn, id).await?;
    roles_users_repo::delete_for_user(txn, id).await?;
    user_repo::delete(txn, id).await
}

/// Every role id must exist; the first unknown one is reported as
/// `UnknownRole` and no link is touched.
pub async fn set_user_roles_in(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    role_ids: &[Uuid],
) -> StoreResult<()> {
    user_repo::require(txn, user_id).await?;
    for role_id in role_ids {
        if role_repo::find_by_id(txn, *role_id).await?.is_none() {
            return Err(StoreError::UnknownRole(*role_id));
        }
    }
    roles_users_repo::replace_for_user(txn, user_id, role_ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_db;

    async fn store() -> IdentityStore {
        IdentityStore::new(test_db().await)
    }

    async fn insert_user(store: &IdentityStore, email: &str) -> user::Model {
        store
            .create_user(NewUser::new(email, "$argon2id$digest"))
            .await
            .expect("create user")
    }

    #[tokio::test]
    async fn duplicate_role_name_is_rejected_and_original_untouched() {
        let store = store().await;
        let original = store
            .create_role("admin", Some("Administrator"))
            .await
            .expect("create role");

        let err = store
            .create_role("admin", Some("other"))
            .await
            .expect_err("duplicate should fail");
        assert!(err.is_duplicate_key());

        let found = store.find_role("admin").await.expect("find").expect("role");
        assert_eq!(found.id, original.id);
        assert_eq!(found.description.as_deref(), Some("Administrator"));
        assert_eq!(store.count_roles().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = store().await;
        insert_user(&store, "a@example.com").await;

        let err = store
            .create_user(NewUser::new("a@example.com", "$argon2id$other"))
            .await
            .expect_err("duplicate should fail");
        assert!(matches!(
            err,
            StoreError::DuplicateKey { field: "email", .. }
        ));
    }

    #[tokio::test]
    async fn linking_is_idempotent() {
        let store = store().await;
        let user = insert_user(&store, "a@example.com").await;
        let role = store.create_role("admin", None).await.expect("role");

        assert!(store.add_role_to_user(user.id, role.id).await.expect("link"));
        assert!(!store.add_role_to_user(user.id, role.id).await.expect("relink"));

        let roles = store.roles_for_user(user.id).await.expect("roles");
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "admin");
    }

    #[tokio::test]
    async fn linking_unknown_role_is_not_found() {
        let store = store().await;
        let user = insert_user(&store, "a@example.com").await;

        let err = store
            .add_role_to_user(user.id, Uuid::new_v4())
            .await
            .expect_err("unknown role");
        assert!(matches!(err, StoreError::NotFound { entity: "role", .. }));
    }

    #[tokio::test]
    async fn deleting_a_held_role_is_refused() {
        let store = store().await;
        let user = insert_user(&store, "a@example.com").await;
        let role = store.create_role("editor", None).await.expect("role");
        store.add_role_to_user(user.id, role.id).await.expect("link");

        let err = store.delete_role(role.id).await.expect_err("still held");
        assert!(matches!(err, StoreError::ReferentialIntegrity { .. }));
        assert!(store.find_role("editor").await.expect("find").is_some());
        assert_eq!(store.roles_for_user(user.id).await.expect("roles").len(), 1);

        store
            .remove_role_from_user(user.id, role.id)
            .await
            .expect("unlink");
        store.delete_role(role.id).await.expect("delete unheld role");
        assert!(store.find_role("editor").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn deleting_a_user_removes_its_links() {
        let store = store().await;
        let user = insert_user(&store, "a@example.com").await;
        let role = store.create_role("editor", None).await.expect("role");
        store.add_role_to_user(user.id, role.id).await.expect("link");

        store.delete_user(user.id).await.expect("delete user");

        assert!(store.get_user("a@example.com").await.expect("get").is_none());
        store.delete_role(role.id).await.expect("role is free again");
    }

    #[tokio::test]
    async fn set_user_roles_replaces_links() {
        let store = store().await;
        let user = insert_user(&store, "a@example.com").await;
        let a = store.create_role("a", None).await.expect("role a");
        let b = store.create_role("b", None).await.expect("role b");
        store.add_role_to_user(user.id, a.id).await.expect("link");

        store
            .set_user_roles(user.id, &[b.id, b.id])
            .await
            .expect("replace");

        let names: Vec<String> = store
            .roles_for_user(user.id)
            .await
            .expect("roles")
            .into_iter()
            .map(|role| role.name)
            .collect();
        assert_eq!(names, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn set_user_roles_with_unknown_role_keeps_existing_links() {
        let store = store().await;
        let user = insert_user(&store, "a@example.com").await;
        let a = store.create_role("a", None).await.expect("role a");
        store.add_role_to_user(user.id, a.id).await.expect("link");

        let missing = Uuid::new_v4();
        let err = store
            .set_user_roles(user.id, &[a.id, missing])
            .await
            .expect_err("unknown role");
        assert!(matches!(err, StoreError::UnknownRole(id) if id == missing));
        assert_eq!(store.roles_for_user(user.id).await.expect("roles").len(), 1);
    }

    #[tokio::test]
    async fn updating_email_to_a_taken_one_conflicts() {
        let store = store().await;
        insert_user(&store, "a@example.com").await;
        let b = insert_user(&store, "b@example.com").await;

        let err = store
            .update_user(
                b.id,
                UserChanges {
                    email: Some("a@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("taken email");
        assert!(err.is_duplicate_key());

        let renamed = store
            .update_user(
                b.id,
                UserChanges {
                    email: Some("b@example.com".to_string()),
                    username: Some(Some("bee".to_string())),
                    ..Default::default()
                },
            )
            .await
            .expect("keeping own email is fine");
        assert_eq!(renamed.username.as_deref(), Some("bee"));
    }

    #[tokio::test]
    async fn record_login_shifts_current_into_last() {
        let store = store().await;
        let user = insert_user(&store, "a@example.com").await;

        let first = store
            .record_login(user.id, Some("10.0.0.1".to_string()), None)
            .await
            .expect("first login");
        assert_eq!(first.login_count, 1);
        assert_eq!(first.current_login_ip.as_deref(), Some("10.0.0.1"));

        let second = store
            .record_login(user.id, Some("10.0.0.2".to_string()), None)
            .await
            .expect("second login");
        assert_eq!(second.login_count, 2);
        assert_eq!(second.last_login_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(second.current_login_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(second.last_login_at, first.current_login_at);
    }

    #[tokio::test]
    async fn list_pages_are_bounded() {
        let store = store().await;
        for i in 0..3 {
            insert_user(&store, &format!("u{i}@example.com")).await;
        }

        let first = store.list_users(1, 2).await.expect("page 1");
        assert_eq!(first.data.len(), 2);
        assert!(first.has_next);

        let second = store.list_users(2, 2).await.expect("page 2");
        assert_eq!(second.data.len(), 1);
        assert!(!second.has_next);

        let err = store.list_users(0, 2).await.expect_err("page 0");
        assert!(matches!(err, StoreError::InvalidPagination { .. }));
        let err = store.list_roles(1, 101).await.expect_err("oversized page");
        assert!(matches!(err, StoreError::InvalidPagination { .. }));
    }
}
