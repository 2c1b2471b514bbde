//! `set` and `unset` handling for the configuration file.

use std::path::Path;

use crate::core::config::{Config, ConfigError, ConfigKey};

/// Errors that can occur when modifying configuration settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingError {
    #[error("Unknown config key: {0} (expected one of: {keys})", keys = known_keys())]
    UnknownKey(String),
    #[error("{0}")]
    InvalidValue(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn known_keys() -> String {
    ConfigKey::ALL
        .iter()
        .map(|key| key.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_key(key: &str) -> Result<ConfigKey, SettingError> {
    ConfigKey::parse(key).ok_or_else(|| SettingError::UnknownKey(key.to_string()))
}

/// Set `key` to `value` in the config file at `config_path`.
///
/// Multi-word values are joined with spaces. Returns the confirmation line.
pub fn set_setting(config_path: &Path, key: &str, value: &[String]) -> Result<String, SettingError> {
    let key = parse_key(key)?;
    let value = value.join(" ");
    let mut config = Config::load_from_path(config_path)?;
    config
        .set_value(key, &value)
        .map_err(SettingError::InvalidValue)?;
    config.save_to_path(config_path)?;
    Ok(format!("✅ Set {} to: {}", key.as_str(), value.trim()))
}

pub fn unset_setting(config_path: &Path, key: &str) -> Result<String, SettingError> {
    let key = parse_key(key)?;
    let mut config = Config::load_from_path(config_path)?;
    config.unset_value(key);
    config.save_to_path(config_path)?;
    Ok(format!("✅ Unset {}", key.as_str()))
}
