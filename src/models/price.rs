//! Price and deposit value object
//!
//! Both fields are nullable; a missing price means "free" for arithmetic
//! purposes. The deposit is conceptually a part of the price and is clamped
//! to never exceed it when both are set. Combination across the base item and
//! selected flags is additive; flag deposits count only when defined.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Price + deposit pair in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Price {
    price: Option<i32>,
    deposit: Option<i32>,
}

impl Price {
    /// Create a price, clamping the deposit to the price when both are set
    pub fn new(price: Option<i32>, deposit: Option<i32>) -> Self {
        let mut value = Self {
            price: None,
            deposit: None,
        };
        value.set_price(price, deposit);
        value
    }

    /// Set price and deposit; deposit is lowered to the price when both are set
    pub fn set_price(&mut self, price: Option<i32>, deposit: Option<i32>) {
        let deposit = match (price, deposit) {
            (Some(p), Some(d)) => Some(d.min(p)),
            (_, d) => d,
        };
        self.price = price;
        self.deposit = deposit;
    }

    pub fn price(&self) -> Option<i32> {
        self.price
    }

    pub fn deposit(&self) -> Option<i32> {
        self.deposit
    }

    /// Price treated as 0 when undefined
    pub fn price_or_zero(&self) -> i32 {
        self.price.unwrap_or(0)
    }

    /// Deposit treated as 0 when undefined
    pub fn deposit_or_zero(&self) -> i32 {
        self.deposit.unwrap_or(0)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Running price/deposit total across a base item and flag deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceTotal {
    pub price: i32,
    pub deposit: i32,
}

impl PriceTotal {
    /// Start a total from a base price
    pub fn from_base(base: &Price) -> Self {
        Self {
            price: base.price_or_zero(),
            deposit: base.deposit_or_zero(),
        }
    }

    /// Add one flag delta `count` times; the deposit delta counts only when
    /// the flag defines one
    pub fn add_flag(&mut self, delta: &Price, count: i32) {
        self.price += delta.price_or_zero() * count;
        if let Some(deposit) = delta.deposit() {
            self.deposit += deposit * count;
        }
    }

    /// Amount left to pay against the full price
    pub fn remaining_price(&self, paid: i32) -> i32 {
        self.price - paid
    }

    /// Amount left to pay against the deposit
    pub fn remaining_deposit(&self, paid: i32) -> i32 {
        self.deposit - paid
    }
}
