//! Block factories: how the layer stack obtains the computation for each layer.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use candle_core::Tensor;
use candle_nn::VarBuilder;
use layerdrop::{error::configuration, Computation, Result};
use layers::RandomState;

use crate::block::{BlockSpec, DecoderBlock};

/// Builds the unary computation run by one layer.
pub trait BlockFactory: Send + Sync {
    fn build(&self, spec: &BlockSpec, vb: VarBuilder) -> Result<Box<dyn Computation>>;
}

/// Default factory producing [`DecoderBlock`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderBlockFactory;

impl BlockFactory for DecoderBlockFactory {
    fn build(&self, spec: &BlockSpec, vb: VarBuilder) -> Result<Box<dyn Computation>> {
        Ok(Box::new(DecoderBlock::load(spec, vb)?))
    }
}

/// Wraps another factory and counts how often each layer's block actually ran.
pub struct CountingBlockFactory<F> {
    inner: F,
    counters: Vec<Arc<AtomicUsize>>,
}

impl<F: BlockFactory> CountingBlockFactory<F> {
    pub fn new(inner: F, n_layers: usize) -> Self {
        Self {
            inner,
            counters: (0..n_layers).map(|_| Arc::new(AtomicUsize::new(0))).collect(),
        }
    }

    /// Invocation count per layer.
    pub fn invocations(&self) -> Vec<usize> {
        self.counters
            .iter()
            .map(|counter| counter.load(Ordering::SeqCst))
            .collect()
    }

    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl<F: BlockFactory> BlockFactory for CountingBlockFactory<F> {
    fn build(&self, spec: &BlockSpec, vb: VarBuilder) -> Result<Box<dyn Computation>> {
        let counter = self.counters.get(spec.layer_index).cloned().ok_or_else(|| {
            configuration(
                "n_layers",
                format!(
                    "counting factory sized for {} layers, asked for layer {}",
                    self.counters.len(),
                    spec.layer_index
                ),
            )
        })?;
        Ok(Box::new(CountingBlock {
            inner: self.inner.build(spec, vb)?,
            counter,
        }))
    }
}

struct CountingBlock {
    inner: Box<dyn Computation>,
    counter: Arc<AtomicUsize>,
}

impl Computation for CountingBlock {
    fn apply(&self, activation: &Tensor, key: RandomState) -> candle_core::Result<Tensor> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        self.inner.apply(activation, key)
    }
}
