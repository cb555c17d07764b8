use thiserror::Error;

pub type Result<T> = std::result::Result<T, LayerDropError>;

#[derive(Error, Debug)]
pub enum LayerDropError {
    #[error("invalid configuration for `{parameter}`: {message}")]
    Configuration {
        parameter: &'static str,
        message: String,
    },

    #[error("branch arity mismatch: {0}")]
    ArityMismatch(String),

    #[error("forward pass composed out of order: {0}")]
    Composition(String),

    #[error("replica group diverged: {0}")]
    SyncDivergence(String),

    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Shorthand for a [`LayerDropError::Configuration`] naming `parameter`.
pub fn configuration<S: Into<String>>(parameter: &'static str, message: S) -> LayerDropError {
    LayerDropError::Configuration {
        parameter,
        message: message.into(),
    }
}
