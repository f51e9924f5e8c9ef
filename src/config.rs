use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;

const CONFIG_FILE: &str = "pid_parser";
const ENV_PREFIX: &str = "PID";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub batch_size: usize,
    pub progress_every: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_path: PathBuf::from("data/pid.sqlite"),
            batch_size: 50,
            progress_every: 10,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `pid_parser.toml` if present, then `PID_*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let settings: Settings = Config::builder()
            .set_default(
                "database_path",
                defaults.database_path.to_string_lossy().to_string(),
            )?
            .set_default("batch_size", defaults.batch_size as u64)?
            .set_default("progress_every", defaults.progress_every as u64)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "batch_size",
                message: "must be at least 1".into(),
            });
        }
        if self.progress_every == 0 {
            return Err(ConfigError::Invalid {
                key: "progress_every",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
