//! Registration offer resolution service
//!
//! Resolves the applicable registration offer for an event and participant
//! category, enforces the temporal activity window and public visibility, and
//! keeps offer usage counters in sync with authoritative participant counts.
//!
//! Lookups return `Ok(None)` when nothing matches; turning that into a
//! not-found failure is the caller's job at the workflow boundary.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::Settings;
use crate::database::{EventRepository, OfferRepository};
use crate::models::capacity::CapacityUsage;
use crate::models::event::EventTree;
use crate::models::offer::RegistrationOffer;
use crate::utils::errors::Result;
use crate::utils::logging::log_usage_update;

/// Offer resolution service
#[derive(Debug, Clone)]
pub struct OfferService {
    offers: OfferRepository,
    events: EventRepository,
    settings: Settings,
}

impl OfferService {
    /// Create a new OfferService instance
    pub fn new(offers: OfferRepository, events: EventRepository, settings: Settings) -> Self {
        Self {
            offers,
            events,
            settings,
        }
    }

    /// Pick the applicable offer among candidates
    ///
    /// Candidates arrive ordered by ascending id; the lowest id wins when
    /// several match, so resolution is deterministic: first created wins.
    pub fn select_offer(
        candidates: &[RegistrationOffer],
        now: DateTime<Utc>,
        only_active: bool,
    ) -> Option<&RegistrationOffer> {
        candidates
            .iter()
            .filter(|offer| !only_active || offer.is_active_at(now))
            .min_by_key(|offer| offer.id)
    }

    /// Resolve the offer for an event + participant-type combination
    pub async fn find_offer(
        &self,
        event_id: i64,
        participant_type: &str,
        only_active: bool,
        only_public: bool,
    ) -> Result<Option<RegistrationOffer>> {
        let candidates = self
            .offers
            .list_for_events(&[event_id], Some(participant_type), only_public, false)
            .await?;

        debug!(
            event_id = event_id,
            participant_type = participant_type,
            candidates = candidates.len(),
            "Resolving registration offer"
        );

        Ok(Self::select_offer(&candidates, Utc::now(), only_active).cloned())
    }

    /// Find an offer by its slug
    pub async fn find_by_slug(
        &self,
        slug: &str,
        only_public: bool,
    ) -> Result<Option<RegistrationOffer>> {
        self.offers.find_by_slug(slug, only_public).await
    }

    /// All offers across an event and its sub-events
    ///
    /// Used to render "all ways to register for this event tree". The walk
    /// depth defaults to the configured recursion depth; None walks the whole
    /// subtree.
    pub async fn event_registration_offers(
        &self,
        root_event_id: i64,
        participant_type: Option<&str>,
        only_active: bool,
        only_public: bool,
        max_depth: Option<usize>,
    ) -> Result<Vec<RegistrationOffer>> {
        let tree = EventTree::new(self.events.list_all(false).await?);
        let depth = max_depth.or(self.settings.registration.default_recursion_depth);
        let event_ids = tree.descendant_ids(root_event_id, depth, false);
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let offers = self
            .offers
            .list_for_events(&event_ids, participant_type, only_public, false)
            .await?
            .into_iter()
            .filter(|offer| !only_active || offer.is_active_at(now))
            .collect();

        Ok(offers)
    }

    /// Recompute the offer's usage counters from the authoritative
    /// participant count and write both tiers back
    ///
    /// Derived, not incremented: safe to call after any participant create,
    /// update or delete, and idempotent when nothing changed.
    pub async fn update_usage(&self, offer_id: i64) -> Result<CapacityUsage> {
        let count = self.offers.count_participants(offer_id, false).await? as i32;
        let usage = CapacityUsage::new(count, count);
        self.offers
            .update_usage(offer_id, usage.base(), usage.full())
            .await?;

        log_usage_update("offer", offer_id, count);
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capacity::Capacity;
    use crate::models::lifecycle::EntityState;
    use crate::models::price::Price;
    use chrono::Duration;

    fn offer(id: i64, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> RegistrationOffer {
        RegistrationOffer {
            id,
            slug: format!("offer-{id}"),
            event_id: 1,
            category_id: 1,
            required_offer_id: None,
            start_date_time: start,
            end_date_time: end,
            public_on_web: true,
            capacity: Capacity::new(10, 10),
            usage: CapacityUsage::default(),
            price: Price::default(),
            state: EntityState::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tie_break_prefers_lowest_id() {
        let now = Utc::now();
        let candidates = vec![offer(7, None, None), offer(3, None, None), offer(5, None, None)];
        let selected = OfferService::select_offer(&candidates, now, true).unwrap();
        assert_eq!(selected.id, 3);
    }

    #[test]
    fn test_inactive_candidates_skipped() {
        let now = Utc::now();
        let candidates = vec![
            offer(1, Some(now + Duration::hours(1)), None),
            offer(2, None, None),
        ];
        let selected = OfferService::select_offer(&candidates, now, true).unwrap();
        assert_eq!(selected.id, 2);
    }

    #[test]
    fn test_inactive_allowed_when_not_filtering() {
        let now = Utc::now();
        let candidates = vec![offer(1, Some(now + Duration::hours(1)), None)];
        assert!(OfferService::select_offer(&candidates, now, true).is_none());
        assert_eq!(
            OfferService::select_offer(&candidates, now, false).unwrap().id,
            1
        );
    }

    #[test]
    fn test_no_candidates_returns_none() {
        assert!(OfferService::select_offer(&[], Utc::now(), true).is_none());
    }
}
