//! Entry points for assembling a model with one of the two skip policies.

use candle_core::Device;
use layerdrop::{GlobalThresholdPolicy, PerLayerBernoulliPolicy, Result, SkipPolicy};

use crate::{
    config::{ModelConfig, PolicyKind},
    factory::{BlockFactory, DecoderBlockFactory},
    model::Model,
};

/// Decoder whose layers share one per-pass threshold.
pub fn build_global_skip_model(config: &ModelConfig, device: &Device) -> Result<Model> {
    Model::with_block_factory(
        &ModelConfig {
            policy: PolicyKind::Global,
            ..config.clone()
        },
        device,
        &DecoderBlockFactory,
    )
}

/// Decoder whose layers are dropped independently.
pub fn build_per_layer_skip_model(config: &ModelConfig, device: &Device) -> Result<Model> {
    Model::with_block_factory(
        &ModelConfig {
            policy: PolicyKind::PerLayer,
            ..config.clone()
        },
        device,
        &DecoderBlockFactory,
    )
}

fn policy_for(config: &ModelConfig) -> Result<Box<dyn SkipPolicy>> {
    Ok(match config.policy {
        PolicyKind::Global => Box::new(GlobalThresholdPolicy::new(
            config.n_layers,
            config.skip_fraction,
            config.mode,
        )?),
        PolicyKind::PerLayer => Box::new(PerLayerBernoulliPolicy::new(
            config.skip_fraction,
            config.mode,
        )?),
    })
}

impl Model {
    /// Builds the model selected by `config.policy` with default decoder blocks.
    pub fn from_config(config: &ModelConfig, device: &Device) -> Result<Self> {
        Self::with_block_factory(config, device, &DecoderBlockFactory)
    }

    /// Builds the model selected by `config.policy` with blocks from `factory`.
    pub fn with_block_factory(
        config: &ModelConfig,
        device: &Device,
        factory: &dyn BlockFactory,
    ) -> Result<Self> {
        config.validate()?;
        let policy = policy_for(config)?;
        Self::assemble(config.clone(), device, policy, factory)
    }
}
