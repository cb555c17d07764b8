//! Lightweight validation helpers shared across layer components.
//!
//! Every helper takes a `context` label naming the tensor being checked so the
//! resulting error points at the offending call site. They return
//! `candle_core::Result<()>` so call sites can propagate errors without panicking.

use candle_core::{Error, Result, Tensor};

/// Ensures a tensor matches the expected dimensions exactly.
pub fn expect_shape(context: &str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    let actual = tensor.dims();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{context}: expected shape {:?}, got {:?}",
            expected, actual
        )))
    }
}

/// Validates the `(batch, seq, hidden)` convention with a known hidden size.
pub fn expect_batch_seq_hidden(context: &str, tensor: &Tensor, hidden: usize) -> Result<()> {
    match tensor.dims() {
        [_, _, actual_hidden] if *actual_hidden == hidden => Ok(()),
        dims => Err(Error::Msg(format!(
            "{context}: expected (batch, seq, {hidden}) layout, got {:?}",
            dims
        ))),
    }
}

/// Validates an integer `(batch, seq)` token id tensor with non-zero extents.
pub fn expect_token_ids(context: &str, tensor: &Tensor) -> Result<(usize, usize)> {
    let (batch, seq) = match tensor.dims() {
        [batch, seq] => (*batch, *seq),
        dims => {
            return Err(Error::Msg(format!(
                "{context}: token ids must be shaped [batch, seq], got {:?}",
                dims
            )))
        }
    };
    if batch == 0 || seq == 0 {
        return Err(Error::Msg(format!(
            "{context}: token ids must have non-zero batch and seq dimensions"
        )));
    }
    if !tensor.dtype().is_int() {
        return Err(Error::Msg(format!(
            "{context}: token ids expected integer dtype but received {:?}",
            tensor.dtype()
        )));
    }
    Ok((batch, seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn shape_errors_name_the_context() -> Result<()> {
        let tensor = Tensor::zeros((2, 3, 4), DType::F32, &Device::Cpu)?;
        expect_shape("hidden", &tensor, &[2, 3, 4])?;
        expect_batch_seq_hidden("hidden", &tensor, 4)?;

        let err = expect_batch_seq_hidden("block.input", &tensor, 8).unwrap_err();
        assert!(err.to_string().contains("block.input"));
        Ok(())
    }

    #[test]
    fn token_ids_must_be_integer_matrices() -> Result<()> {
        let device = Device::Cpu;
        let ids = Tensor::zeros((1, 5), DType::U32, &device)?;
        assert_eq!(expect_token_ids("ids", &ids)?, (1, 5));

        let floats = Tensor::zeros((1, 5), DType::F32, &device)?;
        assert!(expect_token_ids("ids", &floats).is_err());

        let flat = Tensor::zeros(5, DType::U32, &device)?;
        assert!(expect_token_ids("ids", &flat).is_err());
        Ok(())
    }
}
