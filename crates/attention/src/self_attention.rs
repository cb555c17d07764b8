//! Multi-head causal self-attention over `(batch, seq, hidden)` activations.
//!
//! Queries, keys and values come from one fused projection, are split into
//! `[batch, heads, seq, head_dim]`, attend under a causal mask and are merged
//! back before the output projection. Dropout on the attention weights is only
//! active in training mode.

use candle_core::{bail, Result, Tensor, D};
use candle_nn::{ops::softmax, Linear, Module, VarBuilder};
use layers::{checks, Dropout, RandomState};

use crate::masks::build_causal_mask;

/// Shape of a self-attention layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttentionConfig {
    pub hidden_dim: usize,
    pub n_heads: usize,
}

impl AttentionConfig {
    pub fn new(hidden_dim: usize, n_heads: usize) -> Result<Self> {
        if n_heads == 0 || hidden_dim == 0 {
            bail!("attention requires non-zero hidden_dim and n_heads");
        }
        if hidden_dim % n_heads != 0 {
            bail!("hidden_dim ({hidden_dim}) must be divisible by n_heads ({n_heads})");
        }
        Ok(Self {
            hidden_dim,
            n_heads,
        })
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_dim / self.n_heads
    }
}

#[derive(Debug, Clone)]
pub struct CausalSelfAttention {
    config: AttentionConfig,
    qkv_proj: Linear,
    out_proj: Linear,
    dropout: Dropout,
    scale: f64,
}

impl CausalSelfAttention {
    pub fn load(config: AttentionConfig, dropout: Dropout, vb: VarBuilder) -> Result<Self> {
        let hidden = config.hidden_dim;
        let qkv_proj = candle_nn::linear(hidden, 3 * hidden, vb.pp("qkv"))?;
        let out_proj = candle_nn::linear(hidden, hidden, vb.pp("out"))?;
        let scale = 1.0 / (config.head_dim() as f64).sqrt();
        log::debug!(
            "attention::self_attention init hidden={} heads={} head_dim={} dropout={:?}",
            hidden,
            config.n_heads,
            config.head_dim(),
            dropout.mode()
        );
        Ok(Self {
            config,
            qkv_proj,
            out_proj,
            dropout,
            scale,
        })
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    fn split_heads(&self, tensor: &Tensor, batch: usize, seq: usize) -> Result<Tensor> {
        tensor
            .reshape((batch, seq, self.config.n_heads, self.config.head_dim()))?
            .transpose(1, 2)?
            .contiguous()
    }

    /// `key` seeds the dropout mask on the attention weights.
    pub fn forward(&self, hidden: &Tensor, key: RandomState) -> Result<Tensor> {
        let width = self.config.hidden_dim;
        checks::expect_batch_seq_hidden("attention.input", hidden, width)?;
        let (batch, seq, _) = hidden.dims3()?;

        let qkv = self.qkv_proj.forward(hidden)?;
        let q = self.split_heads(&qkv.narrow(2, 0, width)?, batch, seq)?;
        let k = self.split_heads(&qkv.narrow(2, width, width)?, batch, seq)?;
        let v = self.split_heads(&qkv.narrow(2, 2 * width, width)?, batch, seq)?;

        let mask = build_causal_mask(hidden.device(), seq, seq)?.to_dtype(hidden.dtype())?;
        let scores = q
            .matmul(&k.t()?.contiguous()?)?
            .affine(self.scale, 0.0)?
            .broadcast_add(&mask)?;
        let weights = softmax(&scores, D::Minus1)?;
        let weights = self.dropout.forward(&weights, key)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq, width))?;
        self.out_proj.forward(&context)
    }
}
