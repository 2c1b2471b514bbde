use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::api::ToolDefinition;
use crate::core::config::data::path_display;

/// Errors that can occur when reading a tool-definition file.
#[derive(Debug, thiserror::Error)]
pub enum ToolsError {
    #[error("Failed to read tool definitions at {}: {source}", path_display(.path))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse tool definitions at {}: {source}", path_display(.path))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON array of `{name, description, parameters}` objects.
pub fn load_tools(path: &Path) -> Result<Vec<ToolDefinition>, ToolsError> {
    let contents = fs::read_to_string(path).map_err(|source| ToolsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ToolsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of loading tools at startup. A failed load yields no tools plus a
/// notice for the transcript; it never aborts startup.
#[derive(Debug, Default)]
pub struct LoadedTools {
    pub tools: Vec<ToolDefinition>,
    pub notice: Option<String>,
}

pub fn load_tools_or_empty(path: Option<&Path>) -> LoadedTools {
    let Some(path) = path else {
        return LoadedTools::default();
    };

    match load_tools(path) {
        Ok(tools) => {
            debug!(count = tools.len(), path = %path.display(), "Loaded tool definitions");
            LoadedTools {
                tools,
                notice: None,
            }
        }
        Err(err) => {
            warn!(error = %err, "Continuing without tool definitions");
            LoadedTools {
                tools: Vec::new(),
                notice: Some(format!("{err}. Continuing without tools.")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn loads_tool_array() {
        let file = write_temp(
            r#"[{"name":"weather","description":"Get the weather","parameters":{"type":"object","properties":{"city":{"type":"string"}}}}]"#,
        );
        let tools = load_tools(file.path()).expect("load");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "weather");
        assert_eq!(
            tools[0].parameters["properties"]["city"]["type"],
            serde_json::json!("string")
        );
    }

    #[test]
    fn missing_file_degrades_to_empty_with_notice() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loaded = load_tools_or_empty(Some(&dir.path().join("tools.json")));
        assert!(loaded.tools.is_empty());
        assert!(loaded
            .notice
            .as_deref()
            .is_some_and(|notice| notice.contains("Failed to read")));
    }

    #[test]
    fn invalid_json_degrades_to_empty_with_notice() {
        let file = write_temp("{not an array");
        let loaded = load_tools_or_empty(Some(file.path()));
        assert!(loaded.tools.is_empty());
        assert!(loaded
            .notice
            .as_deref()
            .is_some_and(|notice| notice.contains("Failed to parse")));
    }

    #[test]
    fn no_path_means_no_tools_and_no_notice() {
        let loaded = load_tools_or_empty(None);
        assert!(loaded.tools.is_empty());
        assert!(loaded.notice.is_none());
    }
}
