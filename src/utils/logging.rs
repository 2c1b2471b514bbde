//! Transcript logging and diagnostic tracing setup.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::EnvFilter;

use crate::core::message::{ChatTurn, TranscriptRole};

/// Environment variable holding the `tracing` filter directive.
pub const LOG_FILTER_ENV: &str = "OLLAMA_TUI_LOG";

/// Install a `tracing` subscriber that writes to `path`.
///
/// The terminal belongs to the UI, so diagnostics only go to a file and
/// nothing is installed when no path is given.
pub fn init_tracing(path: Option<&Path>) -> io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();

    if installed.is_err() {
        // A subscriber from an embedding process wins.
        tracing::debug!("Global tracing subscriber already installed");
    }
    Ok(())
}

/// Appends finalized user and assistant turns to a plain-text file.
pub struct LoggingState {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl LoggingState {
    /// A log file given on the command line starts active.
    pub fn new(log_file: Option<PathBuf>) -> io::Result<Self> {
        let logging = LoggingState {
            is_active: log_file.is_some(),
            file_path: log_file,
        };

        if let Some(path) = logging.file_path.as_deref() {
            let mut writer = open_append(path)?;
            writeln!(
                writer,
                "## Session started {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            )?;
            writeln!(writer)?;
            writer.flush()?;
        }

        Ok(logging)
    }

    pub fn disabled() -> Self {
        LoggingState {
            file_path: None,
            is_active: false,
        }
    }

    pub fn toggle_logging(&mut self) -> Result<String, String> {
        let Some(path) = self.file_path.clone() else {
            return Err("No log file specified. Restart with --log <FILE> to enable logging.".into());
        };

        if self.is_active {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            self.write_to_log(&format!("## Logging paused at {stamp}"))
                .map_err(|err| format!("Failed to write log: {err}"))?;
            self.is_active = false;
            Ok(format!("Logging paused (file: {})", path.display()))
        } else {
            self.is_active = true;
            Ok(format!("Logging resumed to: {}", path.display()))
        }
    }

    /// Record a finalized turn. App turns and empty replies are skipped.
    pub fn log_turn(&self, turn: &ChatTurn) -> io::Result<()> {
        match turn.role {
            TranscriptRole::User => self.log_message(&format!("You: {}", turn.text)),
            TranscriptRole::Assistant if !turn.text.is_empty() => self.log_message(&turn.text),
            _ => Ok(()),
        }
    }

    pub fn log_message(&self, content: &str) -> io::Result<()> {
        if !self.is_active {
            return Ok(());
        }
        self.write_to_log(content)
    }

    fn write_to_log(&self, content: &str) -> io::Result<()> {
        let Some(path) = self.file_path.as_deref() else {
            return Ok(());
        };

        let mut writer = open_append(path)?;
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between entries, matching the on-screen spacing.
        writeln!(writer)?;
        writer.flush()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        let file_name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name(path)),
            (Some(path), false) => format!("paused ({})", file_name(path)),
        }
    }
}

fn open_append(path: &Path) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}
