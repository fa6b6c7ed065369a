//! Error types for configuration operations

use thiserror::Error;

/// Errors that can occur while loading or saving local configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save config to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no {provider} credentials configured. Run 'makerctl auth --provider {provider}' first")]
    MissingProvider { provider: String },

    #[error("missing '{key}' in the [{provider}] config section. Re-run 'makerctl auth --provider {provider}'")]
    MissingKey { provider: String, key: String },

    #[error("failed to determine config directory")]
    ConfigDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
