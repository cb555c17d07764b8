//! Teacher-forcing alignment for autoregressive decoding.

use candle_core::{Result, Tensor};
use layers::{checks, RunMode};

/// Shifts `(batch, seq)` token ids one step to the right, padding with token `0`.
///
/// Position `t` of the output holds input token `t - 1`, so each position only
/// sees earlier targets. In [`RunMode::Predict`] the ids pass through unchanged.
pub fn shift_right(token_ids: &Tensor, mode: RunMode) -> Result<Tensor> {
    let (batch, seq) = checks::expect_token_ids("shift_right.input", token_ids)?;
    if mode == RunMode::Predict {
        return Ok(token_ids.clone());
    }
    let pad = Tensor::zeros((batch, 1), token_ids.dtype(), token_ids.device())?;
    if seq == 1 {
        return Ok(pad);
    }
    let kept = token_ids.narrow(1, 0, seq - 1)?;
    Tensor::cat(&[&pad, &kept], 1)
}
