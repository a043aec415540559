pub mod admin_layer;
pub mod gate;
pub mod jwt;
pub mod password;
pub mod principal;

pub use admin_layer::RequireAdminLayer;
pub use gate::{Access, AdminAccess, AdminGate, GateRejection};
pub use principal::{Authenticatable, CurrentPrincipal, HasRoles, Principal};
