// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Sitepipe.toml";

/// Read and deserialize a config file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawConfigFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Parse config text and validate it.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Read a config file from disk and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw = load_from_path(path)?;
    ConfigFile::try_from(raw)
}

/// Resolve the effective configuration.
///
/// An explicitly requested file must exist. Without one, `Sitepipe.toml` in
/// the working directory is used when present; otherwise every section takes
/// its defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<(ConfigFile, PathBuf)> {
    if let Some(path) = explicit {
        let cfg = load_and_validate(path)?;
        return Ok((cfg, path.to_path_buf()));
    }

    let path = default_config_path();
    if path.is_file() {
        let cfg = load_and_validate(&path)?;
        Ok((cfg, path))
    } else {
        debug!(path = %path.display(), "no config file found; using built-in defaults");
        Ok((ConfigFile::try_from(RawConfigFile::default())?, path))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
