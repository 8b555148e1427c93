//! Flag resolution engine
//!
//! Aggregates the flag offers applicable to a registration offer, validates a
//! participant's chosen flags against amount-range and capacity constraints,
//! computes flag-driven price deltas and keeps flag usage counters in sync
//! with authoritative selection counts.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::database::FlagRepository;
use crate::models::capacity::CapacityUsage;
use crate::models::flag::FlagOfferView;
use crate::models::participant::FlagSelection;
use crate::models::price::{Price, PriceTotal};
use crate::utils::errors::{EvregError, Result};
use crate::utils::logging::log_usage_update;

/// One flag with its current usage, as rendered per category for UI and
/// CSV export
#[derive(Debug, Clone)]
pub struct FlagAggregate {
    pub flag_offer: FlagOfferView,
    pub count: i32,
}

/// Flag constraint evaluation service
///
/// Whether the overflow capacity tier may be used is the caller's call (it
/// depends on who initiates the registration), so `use_full_capacity` is
/// threaded in rather than read from settings here.
#[derive(Debug, Clone)]
pub struct FlagService {
    flags: FlagRepository,
}

impl FlagService {
    /// Create a new FlagService instance
    pub fn new(flags: FlagRepository) -> Self {
        Self { flags }
    }

    /// Flag offers applicable to an offer, public-only for anonymous web use
    pub async fn applicable_flag_offers(
        &self,
        offer_id: i64,
        only_public: bool,
    ) -> Result<Vec<FlagOfferView>> {
        self.flags.list_for_offer(offer_id, only_public).await
    }

    /// Validate chosen flags against the applicable set
    ///
    /// Each selection must reference an applicable flag offer, stay inside
    /// its amount range, and fit its capacity tier. Applicable flag offers
    /// with a minimum above zero must be selected; leaving them out is the
    /// same as selecting zero units.
    pub fn validate_selections(
        applicable: &[FlagOfferView],
        selections: &[FlagSelection],
        use_full_capacity: bool,
    ) -> Result<()> {
        let by_id: HashMap<i64, &FlagOfferView> = applicable
            .iter()
            .map(|view| (view.flag_offer.id, view))
            .collect();

        // Merge duplicate selections of the same flag offer
        let mut counts: BTreeMap<i64, i32> = BTreeMap::new();
        for selection in selections {
            *counts.entry(selection.flag_offer_id).or_insert(0) += selection.count;
        }

        for (&flag_offer_id, &count) in &counts {
            let view = by_id.get(&flag_offer_id).ok_or_else(|| {
                EvregError::FlagNotAvailable {
                    flag: flag_offer_id.to_string(),
                }
            })?;
            view.flag_offer
                .amount_range
                .check_in_range(&view.flag_slug, count)?;
            view.flag_offer
                .check_capacity(&view.flag_slug, count, use_full_capacity)?;
        }

        // Mandatory flags: min > 0 means absence is an out-of-range zero
        for view in applicable {
            if view.flag_offer.amount_range.min() > 0
                && !counts.contains_key(&view.flag_offer.id)
            {
                view.flag_offer
                    .amount_range
                    .check_in_range(&view.flag_slug, 0)?;
            }
        }

        Ok(())
    }

    /// Total price for a base price plus the selected flag deltas
    pub fn price_total(
        base: &Price,
        applicable: &[FlagOfferView],
        selections: &[FlagSelection],
    ) -> PriceTotal {
        let by_id: HashMap<i64, &FlagOfferView> = applicable
            .iter()
            .map(|view| (view.flag_offer.id, view))
            .collect();

        let mut total = PriceTotal::from_base(base);
        for selection in selections {
            if let Some(view) = by_id.get(&selection.flag_offer_id) {
                total.add_flag(&view.price_delta(), selection.count);
            }
        }
        total
    }

    /// Applicable flags grouped as category-slug -> flag-slug -> aggregate,
    /// with current usage counts, for UI rendering and CSV export
    pub fn aggregate_by_category(
        applicable: &[FlagOfferView],
    ) -> BTreeMap<String, BTreeMap<String, FlagAggregate>> {
        let mut aggregated: BTreeMap<String, BTreeMap<String, FlagAggregate>> = BTreeMap::new();
        for view in applicable {
            aggregated
                .entry(view.category_slug.clone())
                .or_default()
                .insert(
                    view.flag_slug.clone(),
                    FlagAggregate {
                        flag_offer: view.clone(),
                        count: view.flag_offer.usage.base(),
                    },
                );
        }
        aggregated
    }

    /// Applicable flags of an offer aggregated by category
    pub async fn flags_aggregated_by_type(
        &self,
        offer_id: i64,
        only_public: bool,
    ) -> Result<BTreeMap<String, BTreeMap<String, FlagAggregate>>> {
        let applicable = self.applicable_flag_offers(offer_id, only_public).await?;
        Ok(Self::aggregate_by_category(&applicable))
    }

    /// Recompute a flag offer's usage counters from the authoritative
    /// selection count and write both tiers back
    ///
    /// Idempotent; safe to call after any participant create, update or
    /// delete.
    pub async fn update_usage(&self, flag_offer_id: i64) -> Result<CapacityUsage> {
        let count = self.flags.count_selections(flag_offer_id).await? as i32;
        let usage = CapacityUsage::new(count, count);
        self.flags
            .update_flag_offer_usage(flag_offer_id, usage.base(), usage.full())
            .await?;

        log_usage_update("flag_offer", flag_offer_id, count);
        Ok(usage)
    }

    /// Refresh usage for every flag offer a participant references
    pub async fn update_usages(&self, participant_id: i64) -> Result<()> {
        let flag_offer_ids = self
            .flags
            .flag_offer_ids_for_participant(participant_id)
            .await?;

        debug!(
            participant_id = participant_id,
            flag_offers = flag_offer_ids.len(),
            "Refreshing flag usage counters"
        );

        for flag_offer_id in flag_offer_ids {
            self.update_usage(flag_offer_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::amount_range::AmountRange;
    use crate::models::capacity::Capacity;
    use crate::models::flag::RegistrationFlagOffer;
    use crate::models::lifecycle::EntityState;
    use assert_matches::assert_matches;

    fn view(
        id: i64,
        category: &str,
        slug: &str,
        capacity: Capacity,
        usage: CapacityUsage,
        range: AmountRange,
        price: Option<i32>,
        deposit: Option<i32>,
    ) -> FlagOfferView {
        FlagOfferView {
            flag_offer: RegistrationFlagOffer {
                id,
                flag_id: id,
                offer_id: 1,
                public_on_web: true,
                capacity,
                usage,
                amount_range: range,
                state: EntityState::Active,
            },
            flag_slug: slug.to_string(),
            flag_name: slug.to_string(),
            category_slug: category.to_string(),
            flag_price: price,
            flag_deposit: deposit,
        }
    }

    fn tshirt() -> FlagOfferView {
        view(
            1,
            "tshirt-size",
            "tshirt-l",
            Capacity::new(10, 10),
            CapacityUsage::default(),
            AmountRange::new(1, Some(1)),
            Some(150),
            None,
        )
    }

    #[test]
    fn test_selection_of_unknown_flag_rejected() {
        let applicable = vec![tshirt()];
        let selections = vec![FlagSelection {
            flag_offer_id: 99,
            count: 1,
        }];
        assert_matches!(
            FlagService::validate_selections(&applicable, &selections, false),
            Err(EvregError::FlagNotAvailable { .. })
        );
    }

    #[test]
    fn test_amount_range_min_one_max_one() {
        let applicable = vec![tshirt()];

        // Zero units: mandatory flag missing from the selections
        assert_matches!(
            FlagService::validate_selections(&applicable, &[], false),
            Err(EvregError::FlagOutOfRange { count: 0, .. })
        );

        // Two units
        let two = vec![FlagSelection {
            flag_offer_id: 1,
            count: 2,
        }];
        assert_matches!(
            FlagService::validate_selections(&applicable, &two, false),
            Err(EvregError::FlagOutOfRange { count: 2, .. })
        );

        // One unit
        let one = vec![FlagSelection {
            flag_offer_id: 1,
            count: 1,
        }];
        assert!(FlagService::validate_selections(&applicable, &one, false).is_ok());
    }

    #[test]
    fn test_flag_capacity_enforced() {
        let applicable = vec![view(
            2,
            "workshop",
            "workshop-a",
            Capacity::new(2, 4),
            CapacityUsage::new(2, 2),
            AmountRange::new(0, Some(4)),
            None,
            None,
        )];
        let selections = vec![FlagSelection {
            flag_offer_id: 2,
            count: 1,
        }];

        assert_matches!(
            FlagService::validate_selections(&applicable, &selections, false),
            Err(EvregError::FlagCapacityExceeded { .. })
        );
        // Overflow tier is allowed for manager-initiated registration
        assert!(FlagService::validate_selections(&applicable, &selections, true).is_ok());
    }

    #[test]
    fn test_duplicate_selections_merged() {
        let applicable = vec![tshirt()];
        let selections = vec![
            FlagSelection {
                flag_offer_id: 1,
                count: 1,
            },
            FlagSelection {
                flag_offer_id: 1,
                count: 1,
            },
        ];
        // Merged count of 2 breaks max=1
        assert_matches!(
            FlagService::validate_selections(&applicable, &selections, false),
            Err(EvregError::FlagOutOfRange { count: 2, .. })
        );
    }

    #[test]
    fn test_price_total_with_flag_delta() {
        let applicable = vec![tshirt()];
        let selections = vec![FlagSelection {
            flag_offer_id: 1,
            count: 1,
        }];
        let base = Price::new(Some(1000), Some(200));

        let total = FlagService::price_total(&base, &applicable, &selections);
        assert_eq!(total.price, 1150);
        assert_eq!(total.deposit, 200);
    }

    #[test]
    fn test_aggregation_grouped_by_category() {
        let applicable = vec![
            tshirt(),
            view(
                2,
                "tshirt-size",
                "tshirt-m",
                Capacity::new(10, 10),
                CapacityUsage::new(3, 3),
                AmountRange::default(),
                Some(150),
                None,
            ),
            view(
                3,
                "diet",
                "vegan",
                Capacity::new(5, 5),
                CapacityUsage::default(),
                AmountRange::default(),
                None,
                None,
            ),
        ];

        let aggregated = FlagService::aggregate_by_category(&applicable);
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated["tshirt-size"].len(), 2);
        assert_eq!(aggregated["tshirt-size"]["tshirt-m"].count, 3);
        assert!(aggregated["diet"].contains_key("vegan"));
    }
}
