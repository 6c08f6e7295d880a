//! Vertical fill policy for uncovered destination points.
//!
//! When a destination point falls outside every triangulation hull for a
//! layer (or the layer has no valid source points at all), the fill policy
//! decides the written value: zero, missing (NaN), or the value the same
//! point received on the most recent layer that produced a finite result.

use serde::{Deserialize, Serialize};

/// Replacement-value policy for uncovered destination points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Write 0 (default)
    #[default]
    Zero,
    /// Write NaN
    Missing,
    /// Carry down the last finite value from a shallower layer;
    /// NaN when no shallower layer produced one
    PropagateDown,
}

/// Per-run fill state; owns the carry-down buffer when active.
#[derive(Debug)]
pub struct FillState {
    policy: FillPolicy,
    /// Last finite value per destination point; allocated only for
    /// `PropagateDown` with more than one layer
    carry: Option<Vec<f32>>,
}

impl FillState {
    /// Create the state for one run. With a single layer, `PropagateDown`
    /// has nothing to carry and degrades to `Missing`.
    pub fn new(policy: FillPolicy, npoints: usize, nk: usize) -> Self {
        let carry = if policy == FillPolicy::PropagateDown && nk > 1 {
            Some(vec![f32::NAN; npoints])
        } else {
            None
        };
        Self { policy, carry }
    }

    /// Record a finite interpolated value for destination point `i`.
    pub fn record(&mut self, i: usize, value: f32) {
        if let Some(carry) = self.carry.as_mut() {
            carry[i] = value;
        }
    }

    /// The replacement value for an uncovered destination point `i`.
    pub fn fill_value(&self, i: usize) -> f32 {
        match self.policy {
            FillPolicy::Zero => 0.0,
            FillPolicy::Missing => f32::NAN,
            FillPolicy::PropagateDown => match self.carry.as_ref() {
                Some(carry) if carry[i].is_finite() => carry[i],
                _ => f32::NAN,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fill_never_nan() {
        let state = FillState::new(FillPolicy::Zero, 4, 10);
        for i in 0..4 {
            assert_eq!(state.fill_value(i), 0.0);
        }
    }

    #[test]
    fn test_missing_fill_is_nan() {
        let state = FillState::new(FillPolicy::Missing, 4, 10);
        for i in 0..4 {
            assert!(state.fill_value(i).is_nan());
        }
    }

    #[test]
    fn test_propagate_down_carries_last_finite() {
        let mut state = FillState::new(FillPolicy::PropagateDown, 3, 5);
        // Layer 0: nothing recorded yet.
        assert!(state.fill_value(1).is_nan());

        state.record(1, 7.5);
        assert_eq!(state.fill_value(1), 7.5);
        assert!(state.fill_value(0).is_nan());

        // A newer finite value replaces the carried one.
        state.record(1, -2.0);
        assert_eq!(state.fill_value(1), -2.0);
    }

    #[test]
    fn test_propagate_down_single_layer_degrades_to_missing() {
        let mut state = FillState::new(FillPolicy::PropagateDown, 2, 1);
        state.record(0, 3.0);
        assert!(state.fill_value(0).is_nan());
    }
}
