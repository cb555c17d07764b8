use std::{fs, path::Path};

use layerdrop::{error::configuration, Result};
use layers::{ActivationKind, RunMode};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which skip policy the layer stack uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// One threshold per pass; dropped layers form a suffix.
    #[default]
    Global,
    /// Independent draw per layer.
    PerLayer,
}

/// Hyperparameters for assembling the LayerDrop decoder. Immutable once a
/// model has been built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub vocab_size: usize,
    #[serde(default = "default_d_model")]
    pub d_model: usize,
    #[serde(default = "default_d_ff")]
    pub d_ff: usize,
    #[serde(default = "default_n_layers")]
    pub n_layers: usize,
    #[serde(default = "default_n_heads")]
    pub n_heads: usize,
    #[serde(default = "default_dropout")]
    pub dropout: f32,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub activation: ActivationKind,
    #[serde(default = "default_skip_fraction")]
    pub skip_fraction: f32,
    #[serde(default)]
    pub policy: PolicyKind,
}

fn default_d_model() -> usize {
    512
}

fn default_d_ff() -> usize {
    2048
}

fn default_n_layers() -> usize {
    6
}

fn default_n_heads() -> usize {
    8
}

fn default_dropout() -> f32 {
    0.1
}

fn default_max_len() -> usize {
    2048
}

fn default_skip_fraction() -> f32 {
    0.4
}

impl ModelConfig {
    /// Default hyperparameters for a vocabulary of `vocab_size` tokens.
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            d_model: default_d_model(),
            d_ff: default_d_ff(),
            n_layers: default_n_layers(),
            n_heads: default_n_heads(),
            dropout: default_dropout(),
            max_len: default_max_len(),
            mode: RunMode::default(),
            activation: ActivationKind::default(),
            skip_fraction: default_skip_fraction(),
            policy: PolicyKind::default(),
        }
    }

    /// Reads a TOML or JSON config (by extension) and validates it.
    pub fn from_path(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: ModelConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") | None => toml::from_str(&contents)?,
            Some(other) => {
                return Err(ConfigError::Format(format!(
                    "unsupported configuration extension '{other}'"
                )));
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks structural invariants; `n_layers == 0` is allowed.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(configuration("vocab_size", "must be greater than zero"));
        }
        if self.d_model == 0 {
            return Err(configuration("d_model", "must be greater than zero"));
        }
        if self.d_ff == 0 {
            return Err(configuration("d_ff", "must be greater than zero"));
        }
        if self.n_heads == 0 {
            return Err(configuration("n_heads", "must be greater than zero"));
        }
        if self.d_model % self.n_heads != 0 {
            return Err(configuration(
                "n_heads",
                format!(
                    "d_model ({}) must be divisible by n_heads ({})",
                    self.d_model, self.n_heads
                ),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(configuration(
                "dropout",
                format!("must be in [0, 1), got {}", self.dropout),
            ));
        }
        if self.max_len == 0 {
            return Err(configuration("max_len", "must be greater than zero"));
        }
        if !(self.skip_fraction > 0.0 && self.skip_fraction < 1.0) {
            return Err(configuration(
                "skip_fraction",
                format!("must lie in (0, 1), got {}", self.skip_fraction),
            ));
        }
        Ok(())
    }
}
