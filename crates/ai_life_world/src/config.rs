//! Process configuration: language-model client settings plus the world tunables.
//!
//! Both come from `config.toml` when it exists in the working directory, otherwise from the
//! environment (LLM keys only; the world keeps its defaults).

use std::path::Path;
use thiserror::Error;

use crate::simulator::{read_config_table, LlmClientConfig, LlmConfigError, WorldConfig};

pub const WORLD_TABLE_KEY: &str = "world";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    pub llm: LlmClientConfig,
    pub world: WorldConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Llm(#[from] LlmConfigError),
    #[error("invalid [world] table in {path}: {message}")]
    World { path: String, message: String },
}

impl AppConfig {
    pub fn from_default_sources() -> Result<Self, ConfigError> {
        let config_path = Path::new(crate::simulator::DEFAULT_CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::from_config_file(config_path);
        }
        Ok(Self {
            llm: LlmClientConfig::from_env()?,
            world: WorldConfig::default(),
        })
    }

    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        let llm = LlmClientConfig::from_config_file(path)?;
        let table = read_config_table(path)?;
        let world = match table.get(WORLD_TABLE_KEY) {
            Some(value) => value
                .clone()
                .try_into::<WorldConfig>()
                .map_err(|err| ConfigError::World {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })?,
            None => WorldConfig::default(),
        };
        Ok(Self { llm, world })
    }
}
