//! Additive causal masks.
//!
//! Masks are `f32` tensors shaped `[q_len, k_len]` that broadcast over the
//! `[batch, heads, q_len, k_len]` score tensor. Entries are `0.0` where
//! attention is permitted and `f32::NEG_INFINITY` otherwise.

use candle_core::{DType, Device, Result, Tensor};

/// Dtype shared by all additive masks.
pub const MASK_DTYPE: DType = DType::F32;

/// Builds a causal mask for `q_len` queries over `k_len` keys.
///
/// When `k_len > q_len`, queries are aligned with the most recent `q_len` keys
/// and may see the whole prefix before them.
pub fn build_causal_mask(device: &Device, q_len: usize, k_len: usize) -> Result<Tensor> {
    let offset = k_len.saturating_sub(q_len);
    let data: Vec<f32> = (0..q_len)
        .flat_map(|q| {
            (0..k_len).map(move |k| if k > q + offset { f32::NEG_INFINITY } else { 0.0 })
        })
        .collect();
    Tensor::from_vec(data, (q_len, k_len), device)
}
