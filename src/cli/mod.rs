//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod model_list;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::model_list::list_models;
use crate::cli::settings::{set_setting, unset_setting};
use crate::core::config::{ChatSettings, Config, SettingsOverrides};
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "ollama-tui")]
#[command(version)]
#[command(about = "A full-screen terminal chat client for Ollama")]
#[command(
    long_about = "ollama-tui is a full-screen terminal chat client for a local or remote Ollama \
server. Replies stream in as they are generated, with live token and throughput statistics.\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a new line\n\
  Esc               Cancel the running reply (quit when idle)\n\
  Ctrl+P / F2       Choose a model\n\
  Ctrl+L            Clear the chat\n\
  Ctrl+G            Pause or resume the transcript log\n\
  Ctrl+H / F1       Toggle help\n\
  Up/Down/PgUp/PgDn Scroll through the chat\n\
  Ctrl+C            Quit\n\n\
Environment:\n\
  OLLAMA_TUI_LOG    tracing filter for --debug-log (default: info)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the Ollama server
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// JSON file with tool definitions to send with each request
    #[arg(short = 't', long, global = true, value_name = "FILE")]
    pub tools: Option<PathBuf>,

    /// Append the conversation to the specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,

    /// Write diagnostic logs to the specified file
    #[arg(long, global = true, value_name = "FILE")]
    pub debug_log: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// List the models installed on the server
    Models,
    /// Set a configuration value, or show the configuration when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            tools_file: self.tools.clone(),
            log_file: self.log.clone(),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.debug_log.as_deref())?;

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let overrides = args.overrides();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load()?;
            let settings = ChatSettings::resolve(&config, overrides);
            run_chat(settings).await
        }
        Commands::Models => {
            let config = Config::load()?;
            let settings = ChatSettings::resolve(&config, overrides);
            list_models(&settings.base_url, config.default_model.as_deref()).await
        }
        Commands::Set { key: None, .. } => {
            Config::load()?.print_all();
            Ok(())
        }
        Commands::Set {
            key: Some(key),
            value,
        } => {
            let message = set_setting(&Config::config_path()?, &key, &value)?;
            println!("{message}");
            Ok(())
        }
        Commands::Unset { key } => {
            let message = unset_setting(&Config::config_path()?, &key)?;
            println!("{message}");
            Ok(())
        }
    }
}
