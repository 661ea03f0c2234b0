use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::BoardConfig;

pub const CONFIG_FILE: &str = "yata.toml";

/// Error type for config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse yata.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not serialize yata.toml: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Read `yata.toml` from the data directory. A missing file means defaults.
pub fn read_config(data_dir: &Path) -> Result<BoardConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(BoardConfig::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Write a config file. Existing files are left alone; returns whether one
/// was written.
pub fn write_default_config(data_dir: &Path, config: &BoardConfig) -> Result<bool, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    let text = toml::to_string_pretty(config)?;
    fs::create_dir_all(data_dir)
        .and_then(|()| fs::write(&path, text))
        .map_err(|e| ConfigError::WriteError { path, source: e })?;
    Ok(true)
}
