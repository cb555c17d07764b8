//! Fixed sinusoidal positional encoding.
//!
//! Even feature columns carry `sin(pos / 10000^(2k / d))`, odd columns the
//! matching cosine. The table is precomputed for `max_len` positions and is not
//! trainable.

use candle_core::{bail, Device, Result, Tensor};
use layers::checks;

/// Precomputed `(max_len, hidden)` sinusoid table added to embeddings.
#[derive(Debug, Clone)]
pub struct PositionalEncoding {
    table: Tensor,
    max_len: usize,
    hidden_dim: usize,
}

impl PositionalEncoding {
    pub fn new(max_len: usize, hidden_dim: usize, device: &Device) -> Result<Self> {
        if max_len == 0 {
            bail!("positional encoding requires max_len > 0");
        }
        if hidden_dim == 0 {
            bail!("positional encoding requires hidden_dim > 0");
        }
        let log_base = 10_000f64.ln();
        let mut data = Vec::with_capacity(max_len * hidden_dim);
        for pos in 0..max_len {
            for feature in 0..hidden_dim {
                let pair = (feature - feature % 2) as f64;
                let angle = pos as f64 * (-log_base * pair / hidden_dim as f64).exp();
                let value = if feature % 2 == 0 { angle.sin() } else { angle.cos() };
                data.push(value as f32);
            }
        }
        let table = Tensor::from_vec(data, (max_len, hidden_dim), device)?;
        log::debug!("sinusoidal table built: {max_len} positions x {hidden_dim} features");
        Ok(Self {
            table,
            max_len,
            hidden_dim,
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Raw `(max_len, hidden)` table.
    pub fn table(&self) -> &Tensor {
        &self.table
    }

    /// Adds the encoding of positions `0..seq` to a `(batch, seq, hidden)` tensor.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("positional.input", hidden, self.hidden_dim)?;
        let seq = hidden.dim(1)?;
        if seq > self.max_len {
            bail!(
                "sequence length {seq} exceeds positional encoding max_len {}",
                self.max_len
            );
        }
        let positions = self.table.narrow(0, 0, seq)?.unsqueeze(0)?;
        hidden.broadcast_add(&positions.to_dtype(hidden.dtype())?)
    }
}
