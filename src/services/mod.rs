pub mod admin_service;
pub mod login_service;
