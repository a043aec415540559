#[allow(unused_imports)]
pub mod prelude {
    pub use super::role::Entity as Role;
    pub use super::roles_users::Entity as RolesUsers;
    pub use super::user::Entity as User;
}

pub mod role;
pub mod roles_users;
pub mod user;
