pub mod data;
pub mod io;
pub mod settings;


pub use data::{Config, ConfigKey, DEFAULT_BASE_URL};
pub use io::ConfigError;
pub use settings::{ChatSettings, SettingsOverrides};
