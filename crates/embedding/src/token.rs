//! Token embedding table.

use candle_core::{bail, DType, Result, Tensor};
use candle_nn::{Init, VarBuilder};
use layers::checks;

/// Configuration for building a token embedding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEmbeddingConfig {
    /// Size of the vocabulary (number of distinct tokens).
    pub vocab_size: usize,
    /// Dimensionality of each embedding vector.
    pub hidden_dim: usize,
}

/// Learnable token embedding table initialised from `N(0, 1)`.
#[derive(Debug, Clone)]
pub struct TokenEmbedding {
    config: TokenEmbeddingConfig,
    weight: Tensor,
}

impl TokenEmbedding {
    /// Creates the embedding parameters under `vb`.
    pub fn load(config: TokenEmbeddingConfig, vb: VarBuilder) -> Result<Self> {
        if config.vocab_size == 0 {
            bail!("token embedding requires vocab_size > 0");
        }
        if config.hidden_dim == 0 {
            bail!("token embedding requires hidden_dim > 0");
        }
        let weight = vb.get_with_hints(
            (config.vocab_size, config.hidden_dim),
            "weight",
            Init::Randn {
                mean: 0.0,
                stdev: 1.0,
            },
        )?;
        log::debug!(
            "token embedding init vocab={} hidden={}",
            config.vocab_size,
            config.hidden_dim
        );
        Ok(Self { config, weight })
    }

    pub fn config(&self) -> &TokenEmbeddingConfig {
        &self.config
    }

    /// Looks up embeddings for `(batch, seq)` integer ids, returning `(batch, seq, hidden)`.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor> {
        let (batch, seq) = checks::expect_token_ids("embedding.token_ids", token_ids)?;
        let flat = token_ids.to_dtype(DType::I64)?.flatten_all()?;
        self.ensure_id_range(&flat)?;

        self.weight
            .index_select(&flat, 0)?
            .reshape((batch, seq, self.config.hidden_dim))
    }

    fn ensure_id_range(&self, flat_ids: &Tensor) -> Result<()> {
        let min_id = flat_ids.min_all()?.to_scalar::<i64>()?;
        if min_id < 0 {
            bail!("encountered negative token id {min_id}");
        }
        let max_id = flat_ids.max_all()?.to_scalar::<i64>()?;
        let vocab = self.config.vocab_size as i64;
        if max_id >= vocab {
            bail!("token id {max_id} exceeds vocab size {vocab}");
        }
        Ok(())
    }
}
