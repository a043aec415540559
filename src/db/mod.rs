pub mod connection;
pub mod entities;
pub mod pagination;
pub mod role_repo;
pub mod roles_users_repo;
pub mod store;
pub mod user_repo;

pub use store::{IdentityStore, StoreError, StoreResult};
