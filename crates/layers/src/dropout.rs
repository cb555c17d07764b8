//! Inverted dropout driven by an explicit [`RandomState`].
//!
//! Masks are sampled on the host from the supplied key, so the same key always
//! produces the same mask regardless of device. Outside [`RunMode::Train`] the
//! input is returned unchanged.

use candle_core::{Error, Result, Tensor};
use rand::Rng;

use crate::{mode::RunMode, rng::RandomState};

/// Dropout policy applied to activations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropoutMode {
    /// Dropout is disabled (non-train mode or zero probability).
    Disabled,
    /// Dropout is active with the given drop probability.
    Enabled { probability: f32 },
}

impl DropoutMode {
    /// Builds a mode from a probability and run mode; `0.0` or non-train disables dropout.
    pub fn from_probability(probability: f32, mode: RunMode) -> Result<Self> {
        if !(0.0..1.0).contains(&probability) {
            return Err(Error::Msg(format!(
                "dropout probability must be in [0, 1), got {probability}"
            )));
        }
        if probability == 0.0 || !mode.is_train() {
            Ok(DropoutMode::Disabled)
        } else {
            Ok(DropoutMode::Enabled { probability })
        }
    }
}

/// Inverted dropout layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    mode: DropoutMode,
}

impl Dropout {
    pub fn new(probability: f32, mode: RunMode) -> Result<Self> {
        Ok(Self {
            mode: DropoutMode::from_probability(probability, mode)?,
        })
    }

    /// A dropout that never drops anything.
    pub fn disabled() -> Self {
        Self {
            mode: DropoutMode::Disabled,
        }
    }

    pub fn mode(&self) -> DropoutMode {
        self.mode
    }

    /// Applies dropout to a tensor of any rank using `key` for the mask.
    pub fn forward(&self, tensor: &Tensor, key: RandomState) -> Result<Tensor> {
        match self.mode {
            DropoutMode::Disabled => Ok(tensor.clone()),
            DropoutMode::Enabled { probability } => {
                let keep_prob = 1.0 - probability;
                let scale = 1.0 / keep_prob;
                let mut rng = key.rng();
                let mask_data: Vec<f32> = (0..tensor.elem_count())
                    .map(|_| {
                        if rng.gen::<f32>() < keep_prob {
                            scale
                        } else {
                            0.0
                        }
                    })
                    .collect();
                let mask = Tensor::from_vec(mask_data, tensor.dims().to_vec(), tensor.device())?
                    .to_dtype(tensor.dtype())?;
                tensor.mul(&mask)
            }
        }
    }
}
