use std::fmt;

use attention::{AttentionConfig, CausalSelfAttention};
use candle_core::{Result, Tensor};
use candle_nn::VarBuilder;
use layerdrop::Computation;
use layers::{
    checks, ActivationKind, Dropout, FeedForward, FeedForwardConfig, LayerNorm, NormConfig,
    RandomState, RunMode,
};

/// Everything a factory needs to build the block for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    pub d_model: usize,
    pub d_ff: usize,
    pub n_heads: usize,
    pub dropout: f32,
    pub mode: RunMode,
    pub activation: ActivationKind,
    pub layer_index: usize,
}

/// Pre-norm decoder block: causal self-attention then feed-forward, each
/// wrapped in a residual connection.
pub struct DecoderBlock {
    layer_index: usize,
    hidden_dim: usize,
    norm_attn: LayerNorm,
    attention: CausalSelfAttention,
    attn_dropout: Dropout,
    norm_ff: LayerNorm,
    feed_forward: FeedForward,
}

impl fmt::Debug for DecoderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderBlock")
            .field("layer_index", &self.layer_index)
            .field("hidden_dim", &self.hidden_dim)
            .field("heads", &self.attention.config().n_heads)
            .finish()
    }
}

impl DecoderBlock {
    /// Registers the block's parameters under `vb`.
    pub fn load(spec: &BlockSpec, vb: VarBuilder) -> Result<Self> {
        let dropout = Dropout::new(spec.dropout, spec.mode)?;
        let norm_attn = LayerNorm::load(NormConfig::new(spec.d_model), vb.pp("norm_attn"))?;
        let attention = CausalSelfAttention::load(
            AttentionConfig::new(spec.d_model, spec.n_heads)?,
            dropout,
            vb.pp("attention"),
        )?;
        let norm_ff = LayerNorm::load(NormConfig::new(spec.d_model), vb.pp("norm_ff"))?;
        let feed_forward = FeedForward::load(
            FeedForwardConfig::new(spec.d_model, spec.d_ff, spec.activation),
            dropout,
            vb.pp("feed_forward"),
        )?;
        Ok(Self {
            layer_index: spec.layer_index,
            hidden_dim: spec.d_model,
            norm_attn,
            attention,
            attn_dropout: dropout,
            norm_ff,
            feed_forward,
        })
    }

    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    pub fn forward(&self, hidden: &Tensor, key: RandomState) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("decoder_block.input", hidden, self.hidden_dim)?;
        let (attn_key, ff_key) = key.split();
        let (weights_key, residual_key) = attn_key.split();

        let normed = self.norm_attn.forward(hidden)?;
        let attended = self.attention.forward(&normed, weights_key)?;
        let attended = self.attn_dropout.forward(&attended, residual_key)?;
        let hidden = hidden.add(&attended)?;

        let normed = self.norm_ff.forward(&hidden)?;
        let projected = self.feed_forward.forward(&normed, ff_key)?;
        hidden.add(&projected)
    }
}

impl Computation for DecoderBlock {
    fn apply(&self, activation: &Tensor, key: RandomState) -> Result<Tensor> {
        self.forward(activation, key)
    }
}
