//! Participant registration workflow
//!
//! Orchestrates creation of a participant against a resolved offer and chosen
//! flags: verifies every constraint before persisting, computes price totals,
//! refreshes usage counters from authoritative counts and drives the
//! token-based activation round-trip.
//!
//! Capacity checks here are best-effort reads, not atomic compare-and-swaps;
//! two concurrent registrations can both observe free capacity. The usage
//! recomputation after persisting is idempotent and self-heals overcounts,
//! which is the engine's mitigation for the missing lock.

use std::collections::HashMap;

use rand::Rng;
use tracing::{info, warn};

use crate::config::Settings;
use crate::database::{DatabaseService, NewParticipant};
use crate::models::capacity::CapacityUsage;
use crate::models::flag::FlagOfferView;
use crate::models::lifecycle::ActivationState;
use crate::models::participant::{FlagSelection, Participant, RegistrationRequest};
use crate::services::flags::FlagService;
use crate::services::notification::{NotificationKind, NotificationService};
use crate::services::offer::OfferService;
use crate::services::token::TokenService;
use crate::utils::errors::{EvregError, Result};
use crate::utils::logging::{log_capacity_check, log_registration};

/// Registration workflow service
#[derive(Clone)]
pub struct RegistrationService {
    db: DatabaseService,
    offers: OfferService,
    flags: FlagService,
    tokens: TokenService,
    notifications: NotificationService,
    settings: Settings,
}

impl RegistrationService {
    /// Create a new RegistrationService instance
    pub fn new(
        db: DatabaseService,
        offers: OfferService,
        flags: FlagService,
        tokens: TokenService,
        notifications: NotificationService,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            offers,
            flags,
            tokens,
            notifications,
            settings,
        }
    }

    /// Register a participant through an offer
    ///
    /// Verifies contact, offer activity/visibility, the prerequisite offer,
    /// offer capacity, flag constraints and computes price totals before
    /// anything is persisted. The overflow capacity tier is consumed only
    /// under `manager_override`.
    pub async fn register(&self, request: RegistrationRequest) -> Result<Participant> {
        let contact_id = request
            .contact_id
            .ok_or(EvregError::ParticipantContactMissing)?;

        let offer = self
            .db
            .offers
            .find_by_id(request.offer_id, false)
            .await?
            .ok_or_else(|| EvregError::OfferNotFound(request.offer_id.to_string()))?;

        let event = self
            .db
            .events
            .find_by_id(offer.event_id, false)
            .await?
            .ok_or(EvregError::ParticipantEventMissing)?;

        if !request.manager_override {
            if !offer.public_on_web {
                return Err(EvregError::OfferNotPublic(offer.slug.clone()));
            }
            if !offer.is_active_at(chrono::Utc::now()) {
                return Err(EvregError::OfferInactive(offer.slug.clone()));
            }
        }

        if let Some(required_offer_id) = offer.required_offer_id {
            let satisfied = self
                .db
                .participants
                .exists_for_offer_and_contact(required_offer_id, contact_id)
                .await?;
            if !satisfied {
                return Err(EvregError::RequiredOfferNotSatisfied {
                    required_offer_id,
                    contact_id,
                });
            }
        }

        let use_full = request.manager_override
            || self.settings.registration.allow_full_capacity_public;
        log_capacity_check(
            offer.id,
            offer.usage.usage(use_full),
            offer.capacity.capacity(use_full),
            use_full,
        );
        offer.check_capacity(1, use_full)?;

        let applicable = self
            .flags
            .applicable_flag_offers(offer.id, !request.manager_override)
            .await?;
        FlagService::validate_selections(&applicable, &request.selections, use_full)?;

        let total = FlagService::price_total(&offer.price, &applicable, &request.selections);

        let participant = self
            .db
            .participants
            .create(
                NewParticipant {
                    offer_id: offer.id,
                    event_id: offer.event_id,
                    contact_id: Some(contact_id),
                    notes: request.notes.clone(),
                    price_total: total.price,
                    deposit_total: total.deposit,
                    variable_symbol: generate_variable_symbol(),
                },
                &request.selections,
            )
            .await?;

        // Usage is derived, never incremented: recompute from authoritative
        // counts after the write
        self.offers.update_usage(offer.id).await?;
        self.flags.update_usages(participant.id).await?;

        let token = self.tokens.issue_activation(participant.id).await?;
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event.name.clone());
        parameters.insert("token".to_string(), token.token.clone());
        parameters.insert("expires_at".to_string(), token.expires_at.to_rfc3339());
        self.notifications.notify(
            &participant,
            NotificationKind::ActivationRequest,
            &parameters,
        )?;

        log_registration(offer.id, offer.event_id, Some(contact_id), true);
        Ok(participant)
    }

    /// Confirm a participant with a presented activation token
    ///
    /// Transitions unconfirmed to activated exactly once; the token is
    /// consumed in the process. Re-presenting the token afterwards fails with
    /// a token-invalid error and fires no notification.
    pub async fn process_token(&self, participant_id: i64, token: &str) -> Result<Participant> {
        let participant = self
            .db
            .participants
            .find_by_id(participant_id, false)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })?;

        let stored = self.tokens.validate_activation(participant_id, token).await?;

        if participant.activation_state.is_activated() {
            warn!(
                participant_id = participant_id,
                "Activation attempted on an already activated participant"
            );
            return Err(EvregError::TokenInvalid(
                "participant already activated".to_string(),
            ));
        }

        self.db
            .participants
            .set_activation_state(participant_id, ActivationState::Activated)
            .await?;
        self.tokens.consume(stored.id).await?;

        let event_name = self
            .db
            .events
            .find_by_id(participant.event_id, true)
            .await?
            .map(|event| event.name)
            .unwrap_or_default();
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event_name);
        parameters.insert("price_total".to_string(), participant.price_total.to_string());
        parameters.insert(
            "deposit_total".to_string(),
            participant.deposit_total.to_string(),
        );
        self.notifications.notify(
            &participant,
            NotificationKind::ActivationConfirmed,
            &parameters,
        )?;

        info!(participant_id = participant_id, "Participant activated");

        self.db
            .participants
            .find_by_id(participant_id, false)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })
    }

    /// Re-issue an activation token without touching participant data
    pub async fn resend_activation(&self, participant_id: i64) -> Result<()> {
        let participant = self
            .db
            .participants
            .find_by_id(participant_id, false)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })?;

        if participant.activation_state.is_activated() {
            return Err(EvregError::InvalidInput(
                "participant is already activated".to_string(),
            ));
        }

        let event_name = self
            .db
            .events
            .find_by_id(participant.event_id, true)
            .await?
            .map(|event| event.name)
            .unwrap_or_default();

        let token = self.tokens.issue_activation(participant_id).await?;
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event_name);
        parameters.insert("token".to_string(), token.token.clone());
        parameters.insert("expires_at".to_string(), token.expires_at.to_rfc3339());
        self.notifications.notify(
            &participant,
            NotificationKind::ActivationRequest,
            &parameters,
        )?;

        info!(participant_id = participant_id, "Activation e-mail re-sent");
        Ok(())
    }

    /// Replace a participant's flag selections after registration
    ///
    /// The new selections are validated against the applicable flag offers
    /// with the participant's own current units excluded from the usage
    /// counts, so re-selecting the same flags never fails on capacity. The
    /// flag groups are rewritten transactionally, then usage counters and the
    /// cached money fields are refreshed.
    pub async fn update_flags(
        &self,
        participant_id: i64,
        selections: &[FlagSelection],
        manager_override: bool,
    ) -> Result<Participant> {
        let participant = self
            .db
            .participants
            .find_by_id(participant_id, false)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })?;

        let offer = self
            .db
            .offers
            .find_by_id(participant.offer_id, false)
            .await?
            .ok_or(EvregError::ParticipantOfferMissing)?;

        let use_full =
            manager_override || self.settings.registration.allow_full_capacity_public;
        let applicable = self
            .flags
            .applicable_flag_offers(offer.id, !manager_override)
            .await?;

        let current: HashMap<i64, i32> = self
            .db
            .participants
            .list_flag_groups(participant_id)
            .await?
            .into_iter()
            .map(|group| (group.flag_offer_id, group.amount))
            .collect();
        let adjusted: Vec<FlagOfferView> = applicable
            .into_iter()
            .map(|mut view| {
                let own = current.get(&view.flag_offer.id).copied().unwrap_or(0);
                let usage = view.flag_offer.usage;
                view.flag_offer.usage =
                    CapacityUsage::new(usage.base() - own, usage.full() - own);
                view
            })
            .collect();

        FlagService::validate_selections(&adjusted, selections, use_full)?;

        self.db
            .participants
            .replace_flag_groups(participant_id, selections)
            .await?;
        self.flags.update_usages(participant_id).await?;

        let refreshed = self.recalculate_money(participant_id).await?;

        info!(
            participant_id = participant_id,
            selections = selections.len(),
            "Flag selections replaced"
        );
        Ok(refreshed)
    }

    /// Send a registration summary message with the current money state
    pub async fn send_summary(&self, participant_id: i64) -> Result<()> {
        let participant = self
            .db
            .participants
            .find_by_id(participant_id, false)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })?;

        let event_name = self
            .db
            .events
            .find_by_id(participant.event_id, true)
            .await?
            .map(|event| event.name)
            .unwrap_or_default();

        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event_name);
        parameters.insert(
            "price_total".to_string(),
            participant.price_total.to_string(),
        );
        parameters.insert("paid".to_string(), participant.paid.to_string());
        parameters.insert(
            "remaining".to_string(),
            (participant.price_total - participant.paid).to_string(),
        );
        self.notifications
            .notify(&participant, NotificationKind::Summary, &parameters)?;

        Ok(())
    }

    /// Soft-delete a participant and refresh the usage counters it consumed
    pub async fn remove_participant(&self, participant_id: i64) -> Result<()> {
        let participant = self
            .db
            .participants
            .find_by_id(participant_id, false)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })?;

        self.db.participants.soft_delete(participant_id).await?;
        self.offers.update_usage(participant.offer_id).await?;
        self.flags.update_usages(participant_id).await?;

        info!(participant_id = participant_id, "Participant removed");
        Ok(())
    }

    /// Recompute the cached money fields from the offer price, flag deltas
    /// and the authoritative payment sum
    pub async fn recalculate_money(&self, participant_id: i64) -> Result<Participant> {
        let participant = self
            .db
            .participants
            .find_by_id(participant_id, true)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })?;

        let offer = self
            .db
            .offers
            .find_by_id(participant.offer_id, true)
            .await?
            .ok_or(EvregError::ParticipantOfferMissing)?;

        let applicable = self.flags.applicable_flag_offers(offer.id, false).await?;
        let selections: Vec<_> = self
            .db
            .participants
            .list_flag_groups(participant_id)
            .await?
            .into_iter()
            .map(|group| FlagSelection {
                flag_offer_id: group.flag_offer_id,
                count: group.amount,
            })
            .collect();

        let total = FlagService::price_total(&offer.price, &applicable, &selections);
        let paid = self.db.payments.sum_for_participant(participant_id).await? as i32;

        self.db
            .participants
            .update_money(participant_id, total.price, total.deposit, paid)
            .await?;

        self.db
            .participants
            .find_by_id(participant_id, true)
            .await?
            .ok_or(EvregError::ParticipantNotFound { participant_id })
    }
}

/// Generate a fresh variable symbol for payment matching
fn generate_variable_symbol() -> String {
    let mut rng = rand::thread_rng();
    (0..10).map(|_| rng.gen_range(0..10).to_string()).collect()
}
