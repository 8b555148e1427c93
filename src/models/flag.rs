//! Registration flag models
//!
//! Flags are selectable add-ons (t-shirt size, diet, workshops) grouped into
//! categories. A flag offer binds a flag to a registration offer with its own
//! capacity, usage and amount-range constraints.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::amount_range::AmountRange;
use super::capacity::{Capacity, CapacityUsage};
use super::lifecycle::EntityState;
use super::price::Price;
use crate::utils::errors::{EvregError, Result};

/// Grouping of flags for UI and validation (e.g. "T-shirt size")
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationFlagCategory {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub state: EntityState,
}

/// A selectable option belonging to a category, with optional price deltas
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationFlag {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub category_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub price: Price,
    pub state: EntityState,
}

/// Binding of a flag to an offer with capacity and amount-range constraints
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationFlagOffer {
    pub id: i64,
    pub flag_id: i64,
    pub offer_id: i64,
    pub public_on_web: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub capacity: Capacity,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub usage: CapacityUsage,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub amount_range: AmountRange,
    pub state: EntityState,
}

impl RegistrationFlagOffer {
    /// Check that `count` more selections fit the selected capacity tier
    pub fn check_capacity(&self, flag: &str, count: i32, use_full: bool) -> Result<()> {
        let capacity = self.capacity.capacity(use_full);
        let usage = self.usage.usage(use_full);
        if usage + count > capacity {
            return Err(EvregError::FlagCapacityExceeded {
                flag: flag.to_string(),
                usage,
                capacity,
            });
        }
        Ok(())
    }
}

/// A flag offer joined with its flag and category slugs, as the engine works
/// with it when validating and aggregating selections
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FlagOfferView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub flag_offer: RegistrationFlagOffer,
    pub flag_slug: String,
    pub flag_name: String,
    pub category_slug: String,
    pub flag_price: Option<i32>,
    pub flag_deposit: Option<i32>,
}

impl FlagOfferView {
    /// Price delta of one unit of this flag
    pub fn price_delta(&self) -> Price {
        Price::new(self.flag_price, self.flag_deposit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFlagCategoryRequest {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFlagRequest {
    pub slug: String,
    pub name: String,
    pub category_id: i64,
    pub price: Option<i32>,
    pub deposit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFlagOfferRequest {
    pub flag_id: i64,
    pub offer_id: i64,
    pub public_on_web: bool,
    pub base_capacity: i32,
    pub full_capacity: i32,
    pub min_amount: i32,
    pub max_amount: Option<i32>,
}
