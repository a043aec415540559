pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RUST_LOG: &str = "info,tower_http=info";
pub const DEFAULT_DEV_DATABASE_URL: &str = "sqlite://./admin_portal.db?mode=rwc";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DB_MIN_IDLE: u32 = 1;
pub const DEFAULT_DEV_SECRET_KEY: &str = "super-secret-change-me";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_DEV_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_DEV_ADMIN_PASSWORD: &str = "adminpassword";
pub const DEFAULT_ADMIN_ROLE: &str = "admin";
pub const DEFAULT_INSTANCE_CONFIG: &str = "instance/config.toml";
