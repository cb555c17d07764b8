use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{VarBuilder, VarMap};
use embedding::{
    token::{TokenEmbedding, TokenEmbeddingConfig},
    Embedder, EmbedderConfig,
};
use layers::{RandomState, RunMode};

fn make_ids(data: &[i64], shape: (usize, usize)) -> Result<Tensor> {
    Tensor::from_slice(data, shape, &Device::Cpu)
}

fn build_tokens(vocab_size: usize, hidden_dim: usize) -> Result<TokenEmbedding> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    TokenEmbedding::load(
        TokenEmbeddingConfig {
            vocab_size,
            hidden_dim,
        },
        vb,
    )
}

#[test]
fn forward_shape_matches_config() -> Result<()> {
    let embedding = build_tokens(8, 4)?;
    let output = embedding.forward(&make_ids(&[0, 1, 2, 3], (2, 2))?)?;
    assert_eq!(output.dims(), &[2, 2, 4]);
    assert_eq!(output.dtype(), DType::F32);
    Ok(())
}

#[test]
fn forward_rejects_out_of_range_ids() -> Result<()> {
    let embedding = build_tokens(4, 3)?;
    let err = embedding.forward(&make_ids(&[0, 4], (1, 2))?).unwrap_err();
    assert!(err.to_string().contains("token id 4 exceeds vocab size"));

    let err = embedding.forward(&make_ids(&[-1, 2], (1, 2))?).unwrap_err();
    assert!(err.to_string().contains("negative token id"));
    Ok(())
}

#[test]
fn load_rejects_empty_dimensions() {
    for (vocab_size, hidden_dim, message) in [(0, 4, "vocab_size > 0"), (4, 0, "hidden_dim > 0")] {
        match build_tokens(vocab_size, hidden_dim) {
            Err(err) => assert!(err.to_string().contains(message), "{err}"),
            Ok(_) => panic!("{vocab_size}x{hidden_dim} table should be rejected"),
        }
    }
}

#[test]
fn same_id_gives_same_row() -> Result<()> {
    let embedding = build_tokens(5, 6)?;
    let output = embedding.forward(&make_ids(&[3, 3], (1, 2))?)?;
    let rows = output.squeeze(0)?.to_vec2::<f32>()?;
    assert_eq!(rows[0], rows[1]);
    Ok(())
}

#[test]
fn embedder_is_deterministic_outside_training() -> Result<()> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let config = EmbedderConfig {
        vocab_size: 10,
        hidden_dim: 8,
        max_len: 16,
        dropout: 0.5,
        mode: RunMode::Eval,
    };
    let embedder = Embedder::load(&config, vb, &Device::Cpu)?;
    let ids = make_ids(&[1, 2, 3, 4], (1, 4))?;

    let a = embedder.forward(&ids, RandomState::new(1))?;
    let b = embedder.forward(&ids, RandomState::new(2))?;
    assert_eq!(a.dims(), &[1, 4, 8]);
    let diff = a.sub(&b)?.abs()?.max_all()?.to_vec0::<f32>()?;
    assert_eq!(diff, 0.0);
    Ok(())
}

#[test]
fn embedder_dropout_follows_the_key_in_training() -> Result<()> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let config = EmbedderConfig {
        vocab_size: 10,
        hidden_dim: 8,
        max_len: 16,
        dropout: 0.5,
        mode: RunMode::Train,
    };
    let embedder = Embedder::load(&config, vb, &Device::Cpu)?;
    let ids = make_ids(&[1, 2, 3, 4, 5, 6], (1, 6))?;

    let a = embedder.forward(&ids, RandomState::new(11))?;
    let b = embedder.forward(&ids, RandomState::new(11))?;
    let c = embedder.forward(&ids, RandomState::new(12))?;
    assert_eq!(a.sub(&b)?.abs()?.max_all()?.to_vec0::<f32>()?, 0.0);
    assert!(a.sub(&c)?.abs()?.max_all()?.to_vec0::<f32>()? > 0.0);
    Ok(())
}
