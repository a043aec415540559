use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::{
    auth::password,
    config::AppConfig,
    db::{
        IdentityStore, StoreError, StoreResult, role_repo, roles_users_repo,
        user_repo::{self, NewUser},
    },
};

const MAX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);
pub const ADMIN_ROLE_DESCRIPTION: &str = "Administrator";

/// What a seeding run had to create. All `false` means everything was in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub role_created: bool,
    pub user_created: bool,
    pub link_created: bool,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("admin password rejected: {0}")]
    Password(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy)]
pub struct AdminSeed<'a> {
    pub role: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> AdminSeed<'a> {
    pub fn from_config(cfg: &'a AppConfig) -> Self {
        Self {
            role: &cfg.admin_user,
            email: &cfg.admin_email,
            password: &cfg.admin_password,
        }
    }
}

/// Makes sure the admin role and admin user exist and are linked. Existing
/// rows are never modified, so an admin whose password was changed keeps it.
///
/// Another process seeding at the same time shows up as a duplicate key or a
/// busy database; either way the run is retried and finds the other's rows.
pub async fn seed_admin(store: &IdentityStore, seed: AdminSeed<'_>) -> Result<SeedReport, SeedError> {
    let digest =
        password::hash_password(seed.password).map_err(|err| SeedError::Password(err.to_string()))?;

    let mut attempt = 1;
    loop {
        match seed_once(store, seed, &digest).await {
            Ok(report) => {
                tracing::info!(
                    role = seed.role,
                    email = seed.email,
                    role_created = report.role_created,
                    user_created = report.user_created,
                    link_created = report.link_created,
                    "admin seeding finished"
                );
                return Ok(report);
            }
            Err(err) if (err.is_duplicate_key() || err.is_busy()) && attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "admin seeding raced another writer, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn seed_once(store: &IdentityStore, seed: AdminSeed<'_>, digest: &str) -> StoreResult<SeedReport> {
    let txn = store.begin_write().await?;
    let mut report = SeedReport::default();

    let role = match role_repo::find_by_name(&txn, seed.role).await? {
        Some(role) => role,
        None => {
            report.role_created = true;
            role_repo::insert(&txn, seed.role, Some(ADMIN_ROLE_DESCRIPTION)).await?
        }
    };

    let user = match user_repo::find_by_email(&txn, seed.email).await? {
        Some(user) => user,
        None => {
            report.user_created = true;
            let new_user = NewUser {
                confirmed_at: Some(Utc::now().fixed_offset()),
                ..NewUser::new(seed.email, digest)
            };
            user_repo::insert(&txn, new_user).await?
        }
    };

    report.link_created = roles_users_repo::link(&txn, user.id, role.id).await?;

    txn.commit().await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use futures_util::future::join_all;
    use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait};

    use super::*;
    use crate::{
        auth::{AdminGate, Principal, password::verify_password},
        db::{connection, entities::prelude::RolesUsers},
        test_helpers::test_db,
    };

    const SEED: AdminSeed<'static> = AdminSeed {
        role: "admin",
        email: "admin@example.com",
        password: "s3cret-pass",
    };

    #[tokio::test]
    async fn seeds_role_user_and_link_on_empty_store() {
        let store = IdentityStore::new(test_db().await);

        let report = seed_admin(&store, SEED).await.expect("seed");
        assert_eq!(
            report,
            SeedReport {
                role_created: true,
                user_created: true,
                link_created: true,
            }
        );

        let role = store.find_role("admin").await.expect("find").expect("role");
        assert_eq!(role.description.as_deref(), Some(ADMIN_ROLE_DESCRIPTION));

        let user = store
            .get_user("admin@example.com")
            .await
            .expect("get")
            .expect("user");
        assert_ne!(user.password_hash, "s3cret-pass");
        assert!(verify_password("s3cret-pass", &user.password_hash));
        assert!(user.active);
        assert!(user.confirmed_at.is_some());

        let roles = store.roles_for_user(user.id).await.expect("roles");
        let principal = Principal::from_user(&user, &roles);
        assert!(AdminGate::new("admin").is_accessible(Some(&principal)));
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let store = IdentityStore::new(test_db().await);
        seed_admin(&store, SEED).await.expect("first seed");
        let digest = store
            .get_user("admin@example.com")
            .await
            .expect("get")
            .expect("user")
            .password_hash;

        let report = seed_admin(&store, SEED).await.expect("second seed");

        assert_eq!(report, SeedReport::default());
        assert_eq!(store.count_roles().await.expect("roles"), 1);
        assert_eq!(store.count_users().await.expect("users"), 1);
        let after = store
            .get_user("admin@example.com")
            .await
            .expect("get")
            .expect("user");
        assert_eq!(after.password_hash, digest);
    }

    #[tokio::test]
    async fn existing_user_keeps_password_and_gets_linked() {
        let store = IdentityStore::new(test_db().await);
        let existing_digest = password::hash_password("previously-set").expect("hash");
        store
            .create_user(NewUser::new("admin@example.com", existing_digest.clone()))
            .await
            .expect("create user");

        let report = seed_admin(&store, SEED).await.expect("seed");

        assert!(report.role_created);
        assert!(!report.user_created);
        assert!(report.link_created);
        let user = store
            .get_user("admin@example.com")
            .await
            .expect("get")
            .expect("user");
        assert_eq!(user.password_hash, existing_digest);
        assert_eq!(store.roles_for_user(user.id).await.expect("roles").len(), 1);
    }

    /// File-backed database behind a pool with several connections, so
    /// concurrent seeders really run side by side.
    async fn file_db(dir: &tempfile::TempDir) -> DatabaseConnection {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("seed.db").display());
        let mut options = ConnectOptions::new(url);
        options.max_connections(4).min_connections(4).sqlx_logging(false);
        let db = Database::connect(options).await.expect("connect file database");
        connection::prepare(&db).await.expect("prepare database");
        connection::sync_schema(&db).await.expect("sync schema");
        db
    }

    async fn link_rows(db: &DatabaseConnection) -> u64 {
        RolesUsers::find().count(db).await.expect("count links")
    }

    #[tokio::test]
    async fn repeated_runs_leave_exactly_one_link() {
        let db = test_db().await;
        let store = IdentityStore::new(db.clone());
        let seed = AdminSeed {
            role: "admin",
            email: "admin@example.com",
            password: "secret123",
        };

        for _ in 0..3 {
            seed_admin(&store, seed).await.expect("seed");
        }

        assert_eq!(store.count_roles().await.expect("roles"), 1);
        assert_eq!(store.count_users().await.expect("users"), 1);
        assert_eq!(link_rows(&db).await, 1);
        let user = store
            .get_user("admin@example.com")
            .await
            .expect("get")
            .expect("user");
        assert!(verify_password("secret123", &user.password_hash));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_seeders_leave_one_of_each() {
        for round in 0..5 {
            let dir = tempfile::tempdir().expect("temp dir");
            let db = file_db(&dir).await;
            let store = IdentityStore::new(db.clone());

            let seeders = (0..4).map(|_| {
                let store = store.clone();
                tokio::spawn(async move { seed_admin(&store, SEED).await })
            });
            let reports: Vec<SeedReport> = join_all(seeders)
                .await
                .into_iter()
                .map(|joined| {
                    joined
                        .expect("seeder task")
                        .unwrap_or_else(|err| panic!("round {round}: {err}"))
                })
                .collect();

            let created = reports.iter().filter(|report| report.user_created).count();
            assert_eq!(created, 1, "round {round}");
            assert_eq!(store.count_roles().await.expect("roles"), 1);
            assert_eq!(store.count_users().await.expect("users"), 1);
            assert_eq!(link_rows(&db).await, 1);
            db.close().await.expect("close");
        }
    }

    #[tokio::test]
    async fn short_admin_password_is_refused() {
        let store = IdentityStore::new(test_db().await);
        let seed = AdminSeed {
            password: "short",
            ..SEED
        };

        let err = seed_admin(&store, seed).await.expect_err("short password");
        assert!(matches!(err, SeedError::Password(_)));
        assert_eq!(store.count_users().await.expect("users"), 0);
    }
}
