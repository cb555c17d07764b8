//! Layer normalisation composed from differentiable tensor primitives.
//!
//! Inputs follow the `(batch, seq, hidden)` convention and are normalised along
//! the last axis. The computation only uses ops with autograd support so
//! gradients reach the scale and bias parameters.

use candle_core::{Result, Tensor, D};
use candle_nn::{Init, VarBuilder};

use crate::checks;

/// Configuration of a layer normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormConfig {
    /// Size of the hidden dimension being normalised.
    pub hidden_size: usize,
    /// Numeric stabiliser added to the variance.
    pub epsilon: f64,
}

impl NormConfig {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            epsilon: 1e-6,
        }
    }
}

/// LayerNorm with learnable scale and bias.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    config: NormConfig,
    weight: Tensor,
    bias: Tensor,
}

impl LayerNorm {
    /// Constructs a LayerNorm from existing parameters.
    pub fn new(weight: Tensor, bias: Tensor, config: NormConfig) -> Result<Self> {
        checks::expect_shape("norm.weight", &weight, &[config.hidden_size])?;
        checks::expect_shape("norm.bias", &bias, &[config.hidden_size])?;
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    /// Creates trainable parameters under `vb` (scale = 1, bias = 0).
    pub fn load(config: NormConfig, vb: VarBuilder) -> Result<Self> {
        let weight = vb.get_with_hints(config.hidden_size, "weight", Init::Const(1.0))?;
        let bias = vb.get_with_hints(config.hidden_size, "bias", Init::Const(0.0))?;
        Self::new(weight, bias, config)
    }

    pub fn config(&self) -> &NormConfig {
        &self.config
    }

    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("norm.input", hidden, self.config.hidden_size)?;
        let hidden_size = self.config.hidden_size as f64;

        let mean = (hidden.sum_keepdim(D::Minus1)? / hidden_size)?;
        let centered = hidden.broadcast_sub(&mean)?;
        let variance = (centered.sqr()?.sum_keepdim(D::Minus1)? / hidden_size)?;
        let denom = (variance + self.config.epsilon)?.sqrt()?;
        let normalized = centered.broadcast_div(&denom)?;

        normalized
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)
    }
}
