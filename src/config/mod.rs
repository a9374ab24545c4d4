// Configuration management module
// Handles TOML configuration for the corpus source, embedding API and retrieval settings

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_ENV, ArchiveConfig, Config, ConfigError, EmbeddingConfig, RepoConfig, RetrievalConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
