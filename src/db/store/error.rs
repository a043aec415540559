use std::ops::Deref;

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("{entity} not found (id={id})")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("{entity} with {field} '{value}' already exists")]
    DuplicateKey {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{entity} is still referenced: {detail}")]
    ReferentialIntegrity { entity: &'static str, detail: String },
    #[error("Invalid pagination: page={page} page_size={page_size}")]
    InvalidPagination { page: u64, page_size: u64 },
    #[error("Unknown role id {0}")]
    UnknownRole(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }

    /// Lock contention that goes away once the competing transaction ends:
    /// SQLite `BUSY`/`LOCKED` (extended codes included), Postgres
    /// serialization failures and deadlocks.
    pub fn is_busy(&self) -> bool {
        let StoreError::Db(
            DbErr::Conn(RuntimeErr::SqlxError(err))
            | DbErr::Exec(RuntimeErr::SqlxError(err))
            | DbErr::Query(RuntimeErr::SqlxError(err)),
        ) = self
        else {
            return false;
        };
        let sea_orm::sqlx::Error::Database(db_err) = err.deref() else {
            return false;
        };
        let Some(code) = db_err.code() else {
            return false;
        };

        if db_err
            .try_downcast_ref::<sea_orm::sqlx::sqlite::SqliteError>()
            .is_some()
        {
            return code
                .parse::<i32>()
                .is_ok_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED));
        }
        matches!(&*code, "40001" | "40P01")
    }

    /// Classifies a failed write, turning constraint violations reported by
    /// the database into typed errors.
    pub(crate) fn from_write(
        entity: &'static str,
        field: &'static str,
        value: &str,
        err: DbErr,
    ) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateKey {
                entity,
                field,
                value: value.to_string(),
            },
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                StoreError::ReferentialIntegrity { entity, detail }
            }
            _ => StoreError::Db(err),
        }
    }
}
