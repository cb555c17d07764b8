//! Skip policies: how the decision scalar for each layer is produced.
//!
//! A forward pass calls [`SkipPolicy::prepare_pass`] once before the layer
//! stack, then [`SkipPolicy::decide`] once per layer in index order. Every
//! replica issues the same collectives in the same order, so decisions agree
//! across the group.

use std::fmt;

use layers::{RandomState, RunMode};
use log::trace;

use crate::{
    error::{configuration, LayerDropError, Result},
    predicate::ThresholdPredicate,
    replica::{CollectiveSite, ReplicaGroup},
    synced_random::SyncedRandomSource,
};

/// Outcome of one layer's decision in one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDecision {
    pub layer: usize,
    /// The scalar compared against the layer's cutoff; `None` when no scalar
    /// was produced (non-train bypass).
    pub scalar: Option<f32>,
    pub execute: bool,
}

pub trait SkipPolicy: Send + Sync + fmt::Debug {
    /// Produces the scalar shared by every layer of the pass, if the policy has one.
    fn prepare_pass(
        &self,
        rng: &mut RandomState,
        group: &dyn ReplicaGroup,
    ) -> Result<Option<f32>>;

    /// Decides whether `layer` executes in this pass.
    fn decide(
        &self,
        layer: usize,
        pass_scalar: Option<f32>,
        rng: &mut RandomState,
        group: &dyn ReplicaGroup,
    ) -> Result<LayerDecision>;

    fn mode(&self) -> RunMode;

    fn skip_fraction(&self) -> f32;

    fn name(&self) -> &'static str;

    /// Layer count the policy was built for, when its decisions depend on one.
    fn fixed_depth(&self) -> Option<usize> {
        None
    }

    /// Analytic fraction of layers executed per pass.
    fn expected_execution_rate(&self) -> f32;
}

fn validate_skip_fraction(skip_fraction: f32) -> Result<()> {
    if skip_fraction > 0.0 && skip_fraction < 1.0 {
        Ok(())
    } else {
        Err(configuration(
            "skip_fraction",
            format!("must lie in (0, 1), got {skip_fraction}"),
        ))
    }
}

/// One threshold per pass: layer `i` executes iff the threshold exceeds `i`.
///
/// In training the threshold is drawn from `[0, n_layers / skip_fraction)`,
/// so dropped layers always form a contiguous suffix. Outside training the
/// threshold is `n_layers` and every layer runs.
#[derive(Debug, Clone)]
pub struct GlobalThresholdPolicy {
    n_layers: usize,
    skip_fraction: f32,
    mode: RunMode,
    source: SyncedRandomSource,
}

impl GlobalThresholdPolicy {
    pub const SITE: CollectiveSite = CollectiveSite::new("pass_threshold", 0);

    pub fn new(n_layers: usize, skip_fraction: f32, mode: RunMode) -> Result<Self> {
        validate_skip_fraction(skip_fraction)?;
        let source = SyncedRandomSource::new(0.0, n_layers as f32 / skip_fraction)?;
        Ok(Self {
            n_layers,
            skip_fraction,
            mode,
            source,
        })
    }

    pub fn n_layers(&self) -> usize {
        self.n_layers
    }
}

impl SkipPolicy for GlobalThresholdPolicy {
    fn prepare_pass(
        &self,
        rng: &mut RandomState,
        group: &dyn ReplicaGroup,
    ) -> Result<Option<f32>> {
        let threshold = if self.mode.is_train() {
            self.source.sample(rng, group, Self::SITE)?
        } else {
            self.n_layers as f32
        };
        trace!("global threshold for pass: {threshold}");
        Ok(Some(threshold))
    }

    fn decide(
        &self,
        layer: usize,
        pass_scalar: Option<f32>,
        _rng: &mut RandomState,
        _group: &dyn ReplicaGroup,
    ) -> Result<LayerDecision> {
        let threshold = pass_scalar.ok_or_else(|| {
            LayerDropError::Composition(format!(
                "layer {layer} decided without a pass threshold; call prepare_pass first"
            ))
        })?;
        let execute = ThresholdPredicate::new(layer as f32).holds(threshold);
        trace!("layer {layer}: threshold {threshold} -> execute={execute}");
        Ok(LayerDecision {
            layer,
            scalar: Some(threshold),
            execute,
        })
    }

    fn mode(&self) -> RunMode {
        self.mode
    }

    fn skip_fraction(&self) -> f32 {
        self.skip_fraction
    }

    fn name(&self) -> &'static str {
        "global"
    }

    fn fixed_depth(&self) -> Option<usize> {
        Some(self.n_layers)
    }

    fn expected_execution_rate(&self) -> f32 {
        if !self.mode.is_train() || self.n_layers == 0 {
            return 1.0;
        }
        // P(threshold > i) = 1 - i * s / n for every i < n.
        let n = self.n_layers as f32;
        1.0 - self.skip_fraction * (n - 1.0) / (2.0 * n)
    }
}

/// Independent Bernoulli decision per layer with P(skip) = `skip_fraction`.
///
/// Outside training the policy bypasses sampling entirely and always executes.
#[derive(Debug, Clone)]
pub struct PerLayerBernoulliPolicy {
    skip_fraction: f32,
    mode: RunMode,
    source: SyncedRandomSource,
    cutoff: ThresholdPredicate,
}

impl PerLayerBernoulliPolicy {
    pub const SITE_LABEL: &'static str = "layer";

    pub fn new(skip_fraction: f32, mode: RunMode) -> Result<Self> {
        validate_skip_fraction(skip_fraction)?;
        Ok(Self {
            skip_fraction,
            mode,
            source: SyncedRandomSource::new(0.0, 1.0)?,
            cutoff: ThresholdPredicate::new(skip_fraction),
        })
    }
}

impl SkipPolicy for PerLayerBernoulliPolicy {
    fn prepare_pass(
        &self,
        _rng: &mut RandomState,
        _group: &dyn ReplicaGroup,
    ) -> Result<Option<f32>> {
        Ok(None)
    }

    fn decide(
        &self,
        layer: usize,
        _pass_scalar: Option<f32>,
        rng: &mut RandomState,
        group: &dyn ReplicaGroup,
    ) -> Result<LayerDecision> {
        if !self.mode.is_train() {
            return Ok(LayerDecision {
                layer,
                scalar: None,
                execute: true,
            });
        }
        let site = CollectiveSite::new(Self::SITE_LABEL, layer);
        let draw = self.source.sample(rng, group, site)?;
        let execute = self.cutoff.holds(draw);
        trace!("layer {layer}: draw {draw} -> execute={execute}");
        Ok(LayerDecision {
            layer,
            scalar: Some(draw),
            execute,
        })
    }

    fn mode(&self) -> RunMode {
        self.mode
    }

    fn skip_fraction(&self) -> f32 {
        self.skip_fraction
    }

    fn name(&self) -> &'static str {
        "per_layer"
    }

    fn expected_execution_rate(&self) -> f32 {
        if self.mode.is_train() {
            1.0 - self.skip_fraction
        } else {
            1.0
        }
    }
}
