//! Registration offer model
//!
//! An offer is a time-bounded, priced registration window for an event and
//! participant-category combination. Capacity, usage and price live in
//! dedicated value objects composed into the entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::capacity::{Capacity, CapacityUsage};
use super::lifecycle::EntityState;
use super::price::Price;
use crate::utils::errors::{EvregError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationOffer {
    pub id: i64,
    pub slug: String,
    pub event_id: i64,
    pub category_id: i64,
    /// Prerequisite offer the contact must already hold a registration on
    pub required_offer_id: Option<i64>,
    /// Window start; None means open on that side
    pub start_date_time: Option<DateTime<Utc>>,
    /// Window end; None means open on that side
    pub end_date_time: Option<DateTime<Utc>>,
    pub public_on_web: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub capacity: Capacity,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub usage: CapacityUsage,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub price: Price,
    pub state: EntityState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationOffer {
    /// Activity predicate: open bounds are always satisfied on their side
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_date_time.map_or(true, |start| now > start);
        let not_ended = self.end_date_time.map_or(true, |end| now < end);
        started && not_ended
    }

    /// Check that `additional` more participants fit the selected tier
    pub fn check_capacity(&self, additional: i32, use_full: bool) -> Result<()> {
        let capacity = self.capacity.capacity(use_full);
        let usage = self.usage.usage(use_full);
        if usage + additional > capacity {
            return Err(EvregError::EventCapacityExceeded {
                offer: self.slug.clone(),
                usage,
                capacity,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOfferRequest {
    pub slug: String,
    pub event_id: i64,
    pub category_id: i64,
    pub required_offer_id: Option<i64>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub public_on_web: bool,
    pub base_capacity: i32,
    pub full_capacity: i32,
    pub price: Option<i32>,
    pub deposit: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOfferRequest {
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub public_on_web: Option<bool>,
    pub base_capacity: Option<i32>,
    pub full_capacity: Option<i32>,
    pub price: Option<i32>,
    pub deposit: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn offer(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        capacity: Capacity,
        usage: CapacityUsage,
    ) -> RegistrationOffer {
        RegistrationOffer {
            id: 1,
            slug: "test-offer".to_string(),
            event_id: 1,
            category_id: 1,
            required_offer_id: None,
            start_date_time: start,
            end_date_time: end,
            public_on_web: true,
            capacity,
            usage,
            price: Price::default(),
            state: EntityState::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_bounds_always_active() {
        let offer = offer(None, None, Capacity::default(), CapacityUsage::default());
        assert!(offer.is_active_at(Utc::now()));
    }

    #[test]
    fn test_future_start_inactive() {
        let now = Utc::now();
        let offer = offer(
            Some(now + Duration::hours(1)),
            None,
            Capacity::default(),
            CapacityUsage::default(),
        );
        assert!(!offer.is_active_at(now));
    }

    #[test]
    fn test_past_end_inactive() {
        let now = Utc::now();
        let offer = offer(
            None,
            Some(now - Duration::hours(1)),
            Capacity::default(),
            CapacityUsage::default(),
        );
        assert!(!offer.is_active_at(now));
    }

    #[test]
    fn test_inside_window_active() {
        let now = Utc::now();
        let offer = offer(
            Some(now - Duration::hours(1)),
            Some(now + Duration::hours(1)),
            Capacity::default(),
            CapacityUsage::default(),
        );
        assert!(offer.is_active_at(now));
    }

    #[test]
    fn test_capacity_check_base_tier() {
        let offer = offer(
            None,
            None,
            Capacity::new(2, 2),
            CapacityUsage::new(1, 1),
        );
        assert!(offer.check_capacity(1, false).is_ok());
        assert!(offer.check_capacity(2, false).is_err());
    }

    #[test]
    fn test_capacity_check_full_tier_overflow() {
        let offer = offer(
            None,
            None,
            Capacity::new(2, 4),
            CapacityUsage::new(2, 2),
        );
        // Base tier is exhausted, overflow still has room
        assert!(offer.check_capacity(1, false).is_err());
        assert!(offer.check_capacity(1, true).is_ok());
        assert!(offer.check_capacity(3, true).is_err());
    }
}
