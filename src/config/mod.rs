// Configuration management module
// Handles TOML configuration loading, validation and display

pub mod display;
pub mod settings;


pub use display::{init_config, show_config};
pub use settings::{
    AssistantConfig, Config, ConfigError, DatasetConfig, FetchConfig, IndexConfig, OpenAiConfig,
    ServerConfig, TranscriptEncoding,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
