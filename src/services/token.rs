//! Activation token service
//!
//! Issues opaque, single-use, typed tokens bound to a participant with an
//! expiry, and validates presented tokens. Delivery of the token to the
//! participant is the notification layer's job.

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Settings;
use crate::database::ParticipantRepository;
use crate::models::participant::ParticipantToken;
use crate::utils::errors::{EvregError, Result};

/// Token type for the e-mail confirmation round-trip
pub const ACTIVATION_TOKEN_TYPE: &str = "activation";

/// Token issuing and validation service
#[derive(Debug, Clone)]
pub struct TokenService {
    participants: ParticipantRepository,
    settings: Settings,
}

impl TokenService {
    /// Create a new TokenService instance
    pub fn new(participants: ParticipantRepository, settings: Settings) -> Self {
        Self {
            participants,
            settings,
        }
    }

    /// Issue a fresh activation token for a participant
    pub async fn issue_activation(&self, participant_id: i64) -> Result<ParticipantToken> {
        let token = generate_token();
        let expires_at =
            Utc::now() + Duration::hours(self.settings.registration.token_ttl_hours);

        let stored = self
            .participants
            .insert_token(participant_id, &token, ACTIVATION_TOKEN_TYPE, expires_at)
            .await?;

        info!(
            participant_id = participant_id,
            token_id = stored.id,
            "Activation token issued"
        );
        Ok(stored)
    }

    /// Validate a presented activation token
    ///
    /// Fails with a token-invalid error when the token is unknown, of the
    /// wrong type, expired or already consumed.
    pub async fn validate_activation(
        &self,
        participant_id: i64,
        token: &str,
    ) -> Result<ParticipantToken> {
        let stored = self
            .participants
            .find_token(participant_id, token)
            .await?
            .ok_or_else(|| EvregError::TokenInvalid("unknown token".to_string()))?;

        stored.validate(ACTIVATION_TOKEN_TYPE, Utc::now())?;

        debug!(
            participant_id = participant_id,
            token_id = stored.id,
            "Activation token validated"
        );
        Ok(stored)
    }

    /// Mark a token consumed; it cannot validate again
    pub async fn consume(&self, token_id: i64) -> Result<()> {
        self.participants.mark_token_consumed(token_id).await
    }
}

/// Generate an opaque token string
fn generate_token() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}{}", Uuid::new_v4().simple(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let first = generate_token();
        let second = generate_token();
        assert_ne!(first, second);
    }

    #[test]
    fn test_generated_token_shape() {
        let token = generate_token();
        // 32 hex characters from the uuid plus an 8 character suffix
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
