//! Uniform scalar draws that agree across replicas.

use layers::RandomState;

use crate::{
    error::{configuration, Result},
    replica::{CollectiveSite, ReplicaGroup},
};

/// Draws one scalar from `[min, max)` per call.
///
/// With more than one replica the drawn key words are sum-reduced across the
/// group before sampling, so every replica samples the same effective key even
/// when their local streams differ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncedRandomSource {
    min: f32,
    max: f32,
}

impl SyncedRandomSource {
    pub fn new(min: f32, max: f32) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(configuration(
                "range",
                format!("bounds must be finite, got [{min}, {max})"),
            ));
        }
        if min > max {
            return Err(configuration(
                "range",
                format!("min_val ({min}) must not exceed max_val ({max})"),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Advances `state` by one draw and samples from it.
    ///
    /// A degenerate range (`min == max`) still advances the stream and joins the
    /// collective, then returns `min`.
    pub fn sample(
        &self,
        state: &mut RandomState,
        group: &dyn ReplicaGroup,
        site: CollectiveSite,
    ) -> Result<f32> {
        let draw = state.advance();
        let key = if group.world_size() > 1 {
            let mut words = draw.key();
            group.all_reduce_sum(site, &mut words)?;
            RandomState::from_key(words)
        } else {
            draw
        };
        Ok(key.uniform(self.min, self.max))
    }
}
