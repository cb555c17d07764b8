//! Conditional-execution control layer for stochastic-depth decoders.
//!
//! The pieces compose leaf-first:
//!
//! - [`SyncedRandomSource`] draws a scalar that every replica agrees on, using a
//!   sum reduction over a [`ReplicaGroup`].
//! - [`ThresholdPredicate`] turns a scalar into an execute/skip decision.
//! - [`ConditionalBlockExecutor`] runs exactly one of a block or an [`Identity`]
//!   passthrough.
//! - [`SkipPolicy`] implementations ([`GlobalThresholdPolicy`] and
//!   [`PerLayerBernoulliPolicy`]) decide what scalar feeds the predicate.
//!
//! Random state and the replica group are always explicit arguments; nothing in
//! this crate holds hidden randomness.

pub mod conditional;
pub mod error;
pub mod policy;
pub mod predicate;
pub mod replica;
pub mod synced_random;

pub use conditional::{Arity, Branch, Computation, ConditionalBlockExecutor, Identity};
pub use error::{LayerDropError, Result};
pub use policy::{GlobalThresholdPolicy, LayerDecision, PerLayerBernoulliPolicy, SkipPolicy};
pub use predicate::{predicate, ThresholdPredicate};
pub use replica::{CollectiveSite, LocalReplica, ReplicaGroup, ThreadReplicaGroup};
pub use synced_random::SyncedRandomSource;
