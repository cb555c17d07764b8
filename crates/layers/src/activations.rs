//! Activation catalogue for the decoder feed-forward stack.
//!
//! Activations consume tensors shaped as `(batch, seq, hidden)` and return
//! tensors with identical layout.
//!
//! # Built-in formulas
//!
//! * **ReLU** `max(x, 0)`, the default non-linearity of the decoder.
//! * **GELU** uses the erf form `0.5 * x * (1 + erf(x / sqrt(2)))`.
//! * **SiLU / Swish** computes `x * sigmoid(x)`.

use std::{fmt, str::FromStr};

use candle_core::{Result, Tensor};
use serde::{Deserialize, Serialize};

/// Identifies which non-linearity the feed-forward block applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    #[default]
    Relu,
    Gelu,
    Silu,
}

impl ActivationKind {
    /// Applies the activation element-wise.
    pub fn forward(self, input: &Tensor) -> Result<Tensor> {
        match self {
            ActivationKind::Relu => input.relu(),
            ActivationKind::Gelu => input.gelu_erf(),
            ActivationKind::Silu => input.silu(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivationKind::Relu => "relu",
            ActivationKind::Gelu => "gelu",
            ActivationKind::Silu => "silu",
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relu" => Ok(ActivationKind::Relu),
            "gelu" => Ok(ActivationKind::Gelu),
            "silu" | "swish" => Ok(ActivationKind::Silu),
            other => Err(format!("unknown activation '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use std::f64::consts::SQRT_2;

    #[test]
    fn relu_zeroes_negative_inputs() -> Result<()> {
        let input = Tensor::from_slice(&[-1.5f32, 0.0, 2.0], (3,), &Device::Cpu)?;
        let output = ActivationKind::Relu.forward(&input)?.to_vec1::<f32>()?;
        assert_eq!(output, vec![0.0, 0.0, 2.0]);
        Ok(())
    }

    #[test]
    fn gelu_matches_reference_formula() -> Result<()> {
        let input = Tensor::from_slice(&[-2.5f32, -0.5, 0.0, 1.0, 3.0], (5,), &Device::Cpu)?;
        let output = ActivationKind::Gelu.forward(&input)?;

        let reference = {
            let term = input.affine(1.0 / SQRT_2, 0.0)?.erf()?;
            let inner = (Tensor::ones_like(&term)? + term)?;
            input.affine(0.5, 0.0)?.mul(&inner)?
        };

        let diff = output.sub(&reference)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert!(diff < 5e-6);
        Ok(())
    }

    #[test]
    fn silu_matches_swish_reference() -> Result<()> {
        let input = Tensor::from_slice(&[-3.0f32, -1.0, 0.0, 0.5, 2.0], (5,), &Device::Cpu)?;
        let output = ActivationKind::Silu.forward(&input)?;

        let one = Tensor::ones_like(&input)?;
        let denom = (one.clone() + input.neg()?.exp()?)?;
        let reference = input.mul(&one.div(&denom)?)?;
        let diff = output.sub(&reference)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert!(diff < 5e-6);
        Ok(())
    }

    #[test]
    fn parses_names() {
        assert_eq!("ReLU".parse::<ActivationKind>(), Ok(ActivationKind::Relu));
        assert_eq!("swish".parse::<ActivationKind>(), Ok(ActivationKind::Silu));
        assert!("tanh".parse::<ActivationKind>().is_err());
    }
}
