//! Input embedder: token lookup, dropout, then positional encoding.

use candle_core::{Device, Result, Tensor};
use candle_nn::VarBuilder;
use layers::{Dropout, RandomState, RunMode};

use crate::{
    positional::PositionalEncoding,
    token::{TokenEmbedding, TokenEmbeddingConfig},
};

/// Hyperparameters of the embedder.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedderConfig {
    pub vocab_size: usize,
    pub hidden_dim: usize,
    pub max_len: usize,
    pub dropout: f32,
    pub mode: RunMode,
}

#[derive(Debug, Clone)]
pub struct Embedder {
    tokens: TokenEmbedding,
    dropout: Dropout,
    positions: PositionalEncoding,
}

impl Embedder {
    pub fn load(config: &EmbedderConfig, vb: VarBuilder, device: &Device) -> Result<Self> {
        let tokens = TokenEmbedding::load(
            TokenEmbeddingConfig {
                vocab_size: config.vocab_size,
                hidden_dim: config.hidden_dim,
            },
            vb.pp("tokens"),
        )?;
        let dropout = Dropout::new(config.dropout, config.mode)?;
        let positions = PositionalEncoding::new(config.max_len, config.hidden_dim, device)?;
        Ok(Self {
            tokens,
            dropout,
            positions,
        })
    }

    pub fn tokens(&self) -> &TokenEmbedding {
        &self.tokens
    }

    /// Maps `(batch, seq)` ids to `(batch, seq, hidden)` activations.
    pub fn forward(&self, token_ids: &Tensor, key: RandomState) -> Result<Tensor> {
        let embedded = self.tokens.forward(token_ids)?;
        let embedded = self.dropout.forward(&embedded, key)?;
        self.positions.forward(&embedded)
    }
}
