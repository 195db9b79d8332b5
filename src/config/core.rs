use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};

use super::{RenderConfig, WindowConfig};
use crate::utils::ConfigError;

/// Overrides the config file location when set.
pub const CONFIG_PATH_ENV: &str = "SPINNING_GOPHERS_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub window: WindowConfig,
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Reads the config from the environment override or the platform config
/// directory, writing defaults there on first run.
pub fn load_or_create_config() -> Result<AppConfig, ConfigError> {
    let path = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) => PathBuf::from(path),
        None => default_config_path()?,
    };
    load_or_create_config_at(&path)
}

pub fn load_or_create_config_at(path: &Path) -> Result<AppConfig, ConfigError> {
    let io_error = |source: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let default_config = AppConfig::default();
        let toml_content = toml::to_string_pretty(&default_config)?;
        fs::write(path, toml_content).map_err(io_error)?;
        info!("Wrote default config to {}", path.display());
        return Ok(default_config);
    }

    let content = fs::read_to_string(path).map_err(io_error)?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("com", "metroman", "spinning-gophers").ok_or(ConfigError::NoProjectDir)?;
    Ok(proj_dirs.config_dir().join(CONFIG_FILE_NAME))
}
