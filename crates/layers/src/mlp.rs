//! Position-wise feed-forward block.
//!
//! Operates on hidden states shaped `(batch, seq, hidden)`: expand to
//! `intermediate_size`, apply the activation and dropout, contract back to
//! the hidden size and apply dropout again.

use candle_core::{Result, Tensor};
use candle_nn::{Linear, Module, VarBuilder};

use crate::{activations::ActivationKind, checks, dropout::Dropout, rng::RandomState};

/// Configuration of the feed-forward block.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForwardConfig {
    /// Model hidden size.
    pub hidden_size: usize,
    /// Width of the activation space.
    pub intermediate_size: usize,
    /// Activation applied between projections.
    pub activation: ActivationKind,
}

impl FeedForwardConfig {
    pub fn new(hidden_size: usize, intermediate_size: usize, activation: ActivationKind) -> Self {
        Self {
            hidden_size,
            intermediate_size,
            activation,
        }
    }
}

/// Two-projection MLP with dropout after the activation and after the output projection.
#[derive(Debug, Clone)]
pub struct FeedForward {
    config: FeedForwardConfig,
    expand: Linear,
    contract: Linear,
    dropout: Dropout,
}

impl FeedForward {
    pub fn load(config: FeedForwardConfig, dropout: Dropout, vb: VarBuilder) -> Result<Self> {
        let expand = candle_nn::linear(config.hidden_size, config.intermediate_size, vb.pp("expand"))?;
        let contract =
            candle_nn::linear(config.intermediate_size, config.hidden_size, vb.pp("contract"))?;
        Ok(Self {
            config,
            expand,
            contract,
            dropout,
        })
    }

    pub fn config(&self) -> &FeedForwardConfig {
        &self.config
    }

    /// `key` seeds both dropout masks.
    pub fn forward(&self, hidden: &Tensor, key: RandomState) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("mlp.input", hidden, self.config.hidden_size)?;
        let (inner_key, outer_key) = key.split();

        let expanded = self.expand.forward(hidden)?;
        let activated = self.config.activation.forward(&expanded)?;
        let activated = self.dropout.forward(&activated, inner_key)?;
        let contracted = self.contract.forward(&activated)?;
        self.dropout.forward(&contracted, outer_key)
    }
}
