//! Min/max amount constraint for flag selections
//!
//! Bounds how many units of a flag a single participant may pick. `max` is
//! nullable; a missing max means unbounded. Writes clamp `min` into
//! `[0, max]`, and the getter guards against the fields drifting after
//! independent mutation.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::{EvregError, Result};

/// Inclusive min/max bound on flag unit counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AmountRange {
    min_amount: i32,
    max_amount: Option<i32>,
}

impl AmountRange {
    /// Create a range, clamping inputs to the invariant
    pub fn new(min: i32, max: Option<i32>) -> Self {
        let mut range = Self {
            min_amount: 0,
            max_amount: None,
        };
        range.set_range(min, max);
        range
    }

    /// Set both bounds; negative max clamps to 0, min is lowered into [0, max]
    pub fn set_range(&mut self, min: i32, max: Option<i32>) {
        let max = max.map(|m| m.max(0));
        let mut min = min.max(0);
        if let Some(max) = max {
            min = min.min(max);
        }
        self.min_amount = min;
        self.max_amount = max;
    }

    /// Lower bound, never above the upper bound when one is set
    pub fn min(&self) -> i32 {
        match self.max_amount {
            Some(max) => self.min_amount.min(max),
            None => self.min_amount,
        }
    }

    /// Upper bound; None means unbounded
    pub fn max(&self) -> Option<i32> {
        self.max_amount
    }

    /// Check a selected unit count against the range
    ///
    /// Fails with a human-readable out-of-range error naming the flag when
    /// `count < min` or, with max set, `count > max`.
    pub fn check_in_range(&self, flag: &str, count: i32) -> Result<()> {
        let min = self.min();
        let out_of_range = count < min || self.max_amount.map_or(false, |max| count > max);
        if out_of_range {
            return Err(EvregError::FlagOutOfRange {
                flag: flag.to_string(),
                count,
                min,
                max: self
                    .max_amount
                    .map_or_else(|| "unbounded".to_string(), |m| m.to_string()),
            });
        }
        Ok(())
    }
}

impl Default for AmountRange {
    fn default() -> Self {
        Self::new(0, None)
    }
}
