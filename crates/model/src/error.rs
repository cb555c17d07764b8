use layerdrop::LayerDropError;
use thiserror::Error;

/// Failures while loading a [`ModelConfig`](crate::ModelConfig) from disk.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config format error: {0}")]
    Format(String),

    #[error(transparent)]
    Invalid(#[from] LayerDropError),
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Format(value.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        ConfigError::Format(value.to_string())
    }
}
