//! Participant models
//!
//! A participant is a person or organization registered for an event through
//! an offer. Money fields are a derived cache recomputed from the offer
//! price, flag deltas and payments. Selections are stored as flag groups
//! mirroring a flag offer, with one participant-flag row per selected unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::lifecycle::{ActivationState, EntityState};
use crate::utils::errors::{EvregError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: i64,
    pub offer_id: i64,
    pub event_id: i64,
    pub contact_id: Option<i64>,
    pub activation_state: ActivationState,
    pub notes: Option<String>,
    /// Cached total price (base + flag deltas)
    pub price_total: i32,
    /// Cached total deposit (base + defined flag deposits)
    pub deposit_total: i32,
    /// Cached sum of applied payments
    pub paid: i32,
    /// Symbol payments are matched against
    pub variable_symbol: String,
    pub state: EntityState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    pub fn remaining_price(&self) -> i32 {
        self.price_total - self.paid
    }

    pub fn remaining_deposit(&self) -> i32 {
        self.deposit_total - self.paid
    }
}

/// One flag selection of a participant, mirroring a flag offer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantFlagGroup {
    pub id: i64,
    pub participant_id: i64,
    pub flag_offer_id: i64,
    pub amount: i32,
    pub state: EntityState,
}

/// A single selected unit within a flag group
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantFlag {
    pub id: i64,
    pub group_id: i64,
    pub participant_id: i64,
    pub flag_offer_id: i64,
    pub state: EntityState,
}

/// Opaque single-use typed token bound to a participant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantToken {
    pub id: i64,
    pub participant_id: i64,
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ParticipantToken {
    /// Validate the stored token against a type and the current time
    pub fn validate(&self, token_type: &str, now: DateTime<Utc>) -> Result<()> {
        if self.token_type != token_type {
            return Err(EvregError::TokenInvalid(format!(
                "wrong token type: expected {token_type}"
            )));
        }
        if self.consumed_at.is_some() {
            return Err(EvregError::TokenInvalid("already consumed".to_string()));
        }
        if now >= self.expires_at {
            return Err(EvregError::TokenInvalid("expired".to_string()));
        }
        Ok(())
    }
}

/// Requested flag selection: `count` units of a flag offer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlagSelection {
    pub flag_offer_id: i64,
    pub count: i32,
}

/// Input to the registration workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub offer_id: i64,
    pub contact_id: Option<i64>,
    pub selections: Vec<FlagSelection>,
    pub notes: Option<String>,
    /// Manager-initiated registration: may consume the overflow tier and
    /// bypass the public/active gate
    pub manager_override: bool,
}
