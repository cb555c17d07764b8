//! Building blocks for the LayerDrop decoder.
//!
//! This crate hosts the pieces every other crate leans on: the run mode, the
//! explicit random state, seeded dropout, activations, layer normalisation and
//! the feed-forward block, all assembled from Candle primitives.

pub mod activations;
pub mod checks;
pub mod dropout;
pub mod mlp;
pub mod mode;
pub mod norm;
pub mod rng;

pub use activations::ActivationKind;
pub use dropout::{Dropout, DropoutMode};
pub use mlp::{FeedForward, FeedForwardConfig};
pub use mode::RunMode;
pub use norm::{LayerNorm, NormConfig};
pub use rng::RandomState;
