use std::path::PathBuf;

use crate::core::config::data::{Config, DEFAULT_BASE_URL};

/// Values given on the command line; each one wins over the config file.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub tools_file: Option<PathBuf>,
    pub log_file: Option<String>,
}

/// Resolved startup settings. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub base_url: String,
    pub preferred_model: Option<String>,
    pub tools_file: Option<PathBuf>,
    pub theme_name: String,
    pub markdown: bool,
    pub log_file: Option<String>,
}

impl ChatSettings {
    pub fn resolve(config: &Config, overrides: SettingsOverrides) -> Self {
        Self {
            base_url: overrides
                .base_url
                .or_else(|| config.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            preferred_model: overrides
                .model
                .filter(|model| !model.trim().is_empty())
                .or_else(|| config.default_model.clone()),
            tools_file: overrides.tools_file.or_else(|| config.tools_file.clone()),
            theme_name: config.theme.clone().unwrap_or_else(|| "dark".to_string()),
            markdown: config.markdown.unwrap_or(true),
            log_file: overrides.log_file,
        }
    }
}
