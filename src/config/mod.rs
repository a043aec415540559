pub mod configs;
pub mod defaults;
pub mod loader;
pub mod validate;

pub use configs::AppConfig;
pub use loader::{CONFIG_FILE_ENV, ConfigSources};
