use std::path::{Path, PathBuf};

use ::config as config_rs;
use anyhow::{Context, Result};

use super::{AppConfig, defaults};

/// Environment variable naming an extra config file layered over the instance file.
pub const CONFIG_FILE_ENV: &str = "APP_CONFIG_FILE";

/// Where settings are read from, lowest precedence first: built-in defaults,
/// the instance file, the `APP_CONFIG_FILE` file, then environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub instance_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    /// Replaces the process environment when set.
    pub env: Option<config_rs::Map<String, String>>,
}

impl ConfigSources {
    pub fn from_process_env() -> Self {
        load_dotenv();
        Self {
            instance_file: Some(PathBuf::from(defaults::DEFAULT_INSTANCE_CONFIG)),
            config_file: std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from),
            env: None,
        }
    }

    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = config_rs::Config::builder();

        if let Some(path) = self.instance_file.as_deref() {
            builder = builder.add_source(config_rs::File::from(path).required(false));
        }

        if let Some(path) = self.config_file.as_deref() {
            builder = builder.add_source(config_rs::File::from(path).required(true));
        }

        // values stay strings until deserialized so secrets keep leading zeros
        let environment = config_rs::Environment::default().source(self.env.clone());

        let settings = builder
            .add_source(environment)
            .build()
            .with_context(|| format!("failed to read config sources{}", self.describe()))?;

        let cfg = settings
            .try_deserialize::<AppConfig>()
            .context("failed to deserialize config")?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn describe(&self) -> String {
        match self.config_file.as_deref() {
            Some(path) => format!(" ({CONFIG_FILE_ENV}={})", display(path)),
            None => String::new(),
        }
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn load_dotenv() {
    // .env next to the manifest wins over one in the working directory
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let _ = dotenvy::from_filename(manifest_dir.join(".env")).or_else(|_| dotenvy::dotenv());
}
