//! True control-flow branching between a block and a passthrough.
//!
//! Branches are deferred [`Computation`] objects. The executor evaluates
//! exactly one of them per call, so the unselected branch never enters the
//! autograd graph and its parameters receive no gradient for that pass.

use candle_core::Tensor;
use layers::RandomState;

use crate::error::{LayerDropError, Result};

/// Number of activations a computation consumes and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub inputs: usize,
    pub outputs: usize,
}

impl Arity {
    /// One activation in, one activation out.
    pub const UNARY: Self = Self {
        inputs: 1,
        outputs: 1,
    };
}

/// A deferred sub-computation over one activation tensor.
pub trait Computation: Send + Sync {
    fn arity(&self) -> Arity {
        Arity::UNARY
    }

    /// Runs the computation. `key` seeds any dropout inside it.
    fn apply(&self, activation: &Tensor, key: RandomState) -> candle_core::Result<Tensor>;
}

impl Computation for Box<dyn Computation> {
    fn arity(&self) -> Arity {
        (**self).arity()
    }

    fn apply(&self, activation: &Tensor, key: RandomState) -> candle_core::Result<Tensor> {
        (**self).apply(activation, key)
    }
}

/// Passthrough branch with no parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Computation for Identity {
    fn apply(&self, activation: &Tensor, _key: RandomState) -> candle_core::Result<Tensor> {
        Ok(activation.clone())
    }
}

/// Which branch a call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Then,
    Else,
}

pub struct ConditionalBlockExecutor<T, E = Identity> {
    then_branch: T,
    else_branch: E,
}

impl<T: Computation, E: Computation> ConditionalBlockExecutor<T, E> {
    /// Pairs two branches; both must be unary.
    pub fn new(then_branch: T, else_branch: E) -> Result<Self> {
        let (then_arity, else_arity) = (then_branch.arity(), else_branch.arity());
        if then_arity != else_arity || then_arity != Arity::UNARY {
            return Err(LayerDropError::ArityMismatch(format!(
                "then branch is {}->{}, else branch is {}->{}; both must be 1->1",
                then_arity.inputs, then_arity.outputs, else_arity.inputs, else_arity.outputs
            )));
        }
        Ok(Self {
            then_branch,
            else_branch,
        })
    }

    pub fn then_branch(&self) -> &T {
        &self.then_branch
    }

    /// Runs the then branch iff `condition`, otherwise the else branch.
    pub fn run(&self, condition: bool, activation: &Tensor, key: RandomState) -> Result<Tensor> {
        let (branch, output) = if condition {
            (Branch::Then, self.then_branch.apply(activation, key)?)
        } else {
            (Branch::Else, self.else_branch.apply(activation, key)?)
        };
        if output.dims() != activation.dims() {
            return Err(LayerDropError::ArityMismatch(format!(
                "{branch:?} branch returned shape {:?} for input {:?}",
                output.dims(),
                activation.dims()
            )));
        }
        Ok(output)
    }
}
