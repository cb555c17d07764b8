//! LayerDrop decoder assembly.
//!
//! Token ids flow through shift-right, the embedder, `n_layers` gated decoder
//! blocks, a final layer norm and the vocabulary projection, ending in
//! log-probabilities. Each block is wrapped in a
//! [`ConditionalBlockExecutor`](layerdrop::ConditionalBlockExecutor) and gated
//! by the configured [`SkipPolicy`](layerdrop::SkipPolicy).

pub mod block;
pub mod builder;
pub mod config;
pub mod error;
pub mod factory;
pub mod model;

pub use block::{BlockSpec, DecoderBlock};
pub use builder::{build_global_skip_model, build_per_layer_skip_model};
pub use config::{ModelConfig, PolicyKind};
pub use error::ConfigError;
pub use factory::{BlockFactory, CountingBlockFactory, DecoderBlockFactory};
pub use model::{Model, PassTrace};
