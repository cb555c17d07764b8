//! Exact causal self-attention for the decoder blocks.
//!
//! Tensors use the layout `[batch, n_heads, seq_len, head_dim]` inside the
//! kernel and `(batch, seq, hidden)` at its boundary. Causal masks are always
//! enforced, so each token attends only to itself and earlier positions.
//!
//! Dropout is a train-only concern driven by an explicit
//! [`RandomState`](layers::RandomState); evaluation is deterministic.

pub mod masks;
pub mod self_attention;

pub use masks::{build_causal_mask, MASK_DTYPE};
pub use self_attention::{AttentionConfig, CausalSelfAttention};
