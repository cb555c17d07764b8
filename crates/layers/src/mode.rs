//! Run mode shared by every stochastic component of the decoder.
//!
//! The mode is fixed when a model is assembled. Only [`RunMode::Train`] consumes
//! randomness; `eval` and `predict` are fully deterministic.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Execution mode of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Stochastic regularisation (dropout, layer skipping) is active.
    #[default]
    Train,
    /// Deterministic full-depth evaluation.
    Eval,
    /// Deterministic full-depth inference. Teacher-forcing shift is disabled.
    Predict,
}

impl RunMode {
    /// Returns `true` when stochastic behaviour is enabled.
    pub fn is_train(self) -> bool {
        matches!(self, RunMode::Train)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Train => "train",
            RunMode::Eval => "eval",
            RunMode::Predict => "predict",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(RunMode::Train),
            "eval" => Ok(RunMode::Eval),
            "predict" => Ok(RunMode::Predict),
            other => Err(format!(
                "unknown run mode '{other}' (expected train, eval or predict)"
            )),
        }
    }
}
