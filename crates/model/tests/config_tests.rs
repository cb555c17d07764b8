use std::fs;

use anyhow::Result;
use candle_core::Device;
use layers::{ActivationKind, RunMode};
use model::{ConfigError, Model, ModelConfig, PolicyKind};
use tempfile::tempdir;

#[test]
fn loads_toml_and_builds_the_selected_policy() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.toml");
    fs::write(
        &path,
        r#"
vocab_size = 20
d_model = 8
d_ff = 16
n_layers = 2
n_heads = 2
max_len = 8
mode = "eval"
activation = "silu"
skip_fraction = 0.25
policy = "per_layer"
"#,
    )?;

    let config = ModelConfig::from_path(&path)?;
    assert_eq!(config.activation, ActivationKind::Silu);
    assert_eq!(config.policy, PolicyKind::PerLayer);
    assert_eq!(config.dropout, 0.1);

    let model = Model::from_config(&config, &Device::Cpu)?;
    assert_eq!(model.policy().name(), "per_layer");
    assert_eq!(model.mode(), RunMode::Eval);
    assert_eq!(model.n_layers(), 2);
    Ok(())
}

#[test]
fn loads_json() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.json");
    fs::write(&path, r#"{ "vocab_size": 50, "n_layers": 12, "mode": "predict" }"#)?;

    let config = ModelConfig::from_path(&path)?;
    assert_eq!(config.n_layers, 12);
    assert_eq!(config.mode, RunMode::Predict);
    assert_eq!(config.policy, PolicyKind::Global);
    Ok(())
}

#[test]
fn rejects_invalid_values_and_unknown_formats() -> Result<()> {
    let dir = tempdir()?;
    let invalid = dir.path().join("bad.toml");
    fs::write(&invalid, "vocab_size = 10\nskip_fraction = 1.5\n")?;
    assert!(matches!(
        ModelConfig::from_path(&invalid),
        Err(ConfigError::Invalid(_))
    ));

    let yaml = dir.path().join("model.yaml");
    fs::write(&yaml, "vocab_size: 10\n")?;
    assert!(matches!(ModelConfig::from_path(&yaml), Err(ConfigError::Format(_))));

    let missing = dir.path().join("absent.toml");
    assert!(matches!(ModelConfig::from_path(&missing), Err(ConfigError::Io(_))));
    Ok(())
}
