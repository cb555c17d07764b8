//! Threshold test feeding the conditional executor.

/// `true` iff `value` is strictly greater than `cutoff`; equality skips.
pub fn predicate(value: f32, cutoff: f32) -> bool {
    value > cutoff
}

/// A [`predicate`] bound to a fixed cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPredicate {
    cutoff: f32,
}

impl ThresholdPredicate {
    pub fn new(cutoff: f32) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn holds(&self, value: f32) -> bool {
        predicate(value, self.cutoff)
    }
}
