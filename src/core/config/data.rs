use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the Ollama server
    pub base_url: Option<String>,
    /// Model to start with when none is picked
    pub default_model: Option<String>,
    /// JSON file with tool definitions sent along with every request
    pub tools_file: Option<PathBuf>,
    /// UI theme name ("dark" or "light")
    pub theme: Option<String>,
    /// Enable markdown rendering of assistant replies
    pub markdown: Option<bool>,
}

/// Keys accepted by `set` and `unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BaseUrl,
    DefaultModel,
    ToolsFile,
    Theme,
    Markdown,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::BaseUrl,
        ConfigKey::DefaultModel,
        ConfigKey::ToolsFile,
        ConfigKey::Theme,
        ConfigKey::Markdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::BaseUrl => "base-url",
            ConfigKey::DefaultModel => "default-model",
            ConfigKey::ToolsFile => "tools-file",
            ConfigKey::Theme => "theme",
            ConfigKey::Markdown => "markdown",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == key)
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {}", key.as_str()));
        }
        match key {
            ConfigKey::BaseUrl => self.base_url = Some(value.to_string()),
            ConfigKey::DefaultModel => self.default_model = Some(value.to_string()),
            ConfigKey::ToolsFile => self.tools_file = Some(PathBuf::from(value)),
            ConfigKey::Theme => match value.to_ascii_lowercase().as_str() {
                "dark" | "light" => self.theme = Some(value.to_ascii_lowercase()),
                _ => return Err(format!("Unknown theme: {value} (expected dark or light)")),
            },
            ConfigKey::Markdown => {
                let enabled = parse_bool(value)
                    .ok_or_else(|| format!("Expected on/off for markdown, got: {value}"))?;
                self.markdown = Some(enabled);
            }
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::DefaultModel => self.default_model = None,
            ConfigKey::ToolsFile => self.tools_file = None,
            ConfigKey::Theme => self.theme = None,
            ConfigKey::Markdown => self.markdown = None,
        }
    }

    pub fn describe(&self) -> Vec<String> {
        let unset = "(unset)".to_string();
        vec![
            format!(
                "  base-url: {}",
                self.base_url
                    .clone()
                    .unwrap_or_else(|| format!("{DEFAULT_BASE_URL} (default)"))
            ),
            format!(
                "  default-model: {}",
                self.default_model.clone().unwrap_or(unset.clone())
            ),
            format!(
                "  tools-file: {}",
                self.tools_file
                    .as_ref()
                    .map(path_display)
                    .unwrap_or(unset.clone())
            ),
            format!("  theme: {}", self.theme.clone().unwrap_or(unset)),
            format!(
                "  markdown: {}",
                if self.markdown.unwrap_or(true) {
                    "on"
                } else {
                    "off"
                }
            ),
        ]
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        for line in self.describe() {
            println!("{line}");
        }
    }
}
