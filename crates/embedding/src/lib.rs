//! Embedding crate
//!
//! Token lookup, fixed sinusoidal positions, the teacher-forcing shift and the
//! [`Embedder`] that chains them ahead of the decoder stack.

pub mod embedder;
pub mod positional;
pub mod shift;
pub mod token;

pub use embedder::{Embedder, EmbedderConfig};
pub use positional::PositionalEncoding;
pub use shift::shift_right;
pub use token::{TokenEmbedding, TokenEmbeddingConfig};
