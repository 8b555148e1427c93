//! Two-tier capacity and usage value objects
//!
//! Capacity comes in two tiers: the base tier is the normal public limit, the
//! full tier includes manager-authorized overflow. Both values are clamped to
//! stay non-negative and to keep `full >= base` on every write; getters guard
//! defensively against the two fields drifting apart after independent
//! mutation.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Two-tier capacity limit (base/regular vs full/overflow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Capacity {
    base_capacity: i32,
    full_capacity: i32,
}

impl Capacity {
    /// Create a capacity, clamping inputs to the invariant
    pub fn new(base: i32, full: i32) -> Self {
        let mut capacity = Self {
            base_capacity: 0,
            full_capacity: 0,
        };
        capacity.set_capacity(base, full);
        capacity
    }

    /// Set both tiers; negatives clamp to 0, full is raised to at least base
    pub fn set_capacity(&mut self, base: i32, full: i32) {
        let base = base.max(0);
        let full = full.max(0).max(base);
        self.base_capacity = base;
        self.full_capacity = full;
    }

    /// Base tier, never above the full tier
    pub fn base(&self) -> i32 {
        self.base_capacity.min(self.full_capacity)
    }

    /// Full tier
    pub fn full(&self) -> i32 {
        self.full_capacity
    }

    /// Select a tier
    pub fn capacity(&self, use_full: bool) -> i32 {
        if use_full {
            self.full()
        } else {
            self.base()
        }
    }

    /// Seats left in a tier given current usage; never negative
    pub fn remaining(&self, usage: &CapacityUsage, use_full: bool) -> i32 {
        (self.capacity(use_full) - usage.usage(use_full)).max(0)
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Current usage counts mirroring the two capacity tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CapacityUsage {
    base_usage: i32,
    full_usage: i32,
}

impl CapacityUsage {
    /// Create a usage pair, clamping inputs to the invariant
    pub fn new(base: i32, full: i32) -> Self {
        let mut usage = Self {
            base_usage: 0,
            full_usage: 0,
        };
        usage.set_usage(base, full);
        usage
    }

    /// Set both counters; negatives clamp to 0, full is raised to at least base
    pub fn set_usage(&mut self, base: i32, full: i32) {
        let base = base.max(0);
        let full = full.max(0).max(base);
        self.base_usage = base;
        self.full_usage = full;
    }

    /// Base-tier usage, never above the full-tier counter
    pub fn base(&self) -> i32 {
        self.base_usage.min(self.full_usage)
    }

    /// Full-tier usage
    pub fn full(&self) -> i32 {
        self.full_usage
    }

    /// Select a tier
    pub fn usage(&self, use_full: bool) -> i32 {
        if use_full {
            self.full()
        } else {
            self.base()
        }
    }
}

impl Default for CapacityUsage {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
