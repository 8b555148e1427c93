//! Error handling for evreg
//!
//! This module defines the main error type used throughout the registration
//! engine and provides a unified error handling strategy. Lookup methods
//! return `Ok(None)` for missing entities; the variants below signal genuine
//! constraint violations and are never used for ordinary control flow.

use thiserror::Error;

/// Main error type for the registration engine
#[derive(Error, Debug)]
pub enum EvregError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registration offer not found: {0}")]
    OfferNotFound(String),

    #[error("Participant not found: {participant_id}")]
    ParticipantNotFound { participant_id: i64 },

    #[error("Event capacity exceeded for offer '{offer}': usage {usage} of {capacity}")]
    EventCapacityExceeded {
        offer: String,
        usage: i32,
        capacity: i32,
    },

    #[error("Flag capacity exceeded for '{flag}': usage {usage} of {capacity}")]
    FlagCapacityExceeded {
        flag: String,
        usage: i32,
        capacity: i32,
    },

    #[error("Flag amount out of range for '{flag}': {count} not in [{min}, {max}]")]
    FlagOutOfRange {
        flag: String,
        count: i32,
        min: i32,
        max: String,
    },

    #[error("Flag '{flag}' is not available for this offer")]
    FlagNotAvailable { flag: String },

    #[error("Participant is missing a contact")]
    ParticipantContactMissing,

    #[error("Participant is missing an event")]
    ParticipantEventMissing,

    #[error("Participant is missing a registration offer")]
    ParticipantOfferMissing,

    #[error("Registration offer '{0}' is not currently active")]
    OfferInactive(String),

    #[error("Registration offer '{0}' is not open to the public")]
    OfferNotPublic(String),

    #[error("Required offer {required_offer_id} is not satisfied by contact {contact_id}")]
    RequiredOfferNotSatisfied {
        required_offer_id: i64,
        contact_id: i64,
    },

    #[error("Token invalid: {0}")]
    TokenInvalid(String),

    #[error("Payment error: {message}")]
    Payment {
        message: String,
        /// Compact variant for summary reporting
        short: String,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EvregError>;

impl EvregError {
    /// Build a payment error carrying both a full and a short message
    pub fn payment(message: impl Into<String>, short: impl Into<String>) -> Self {
        EvregError::Payment {
            message: message.into(),
            short: short.into(),
        }
    }

    /// Check if the error is a constraint violation a user can act on
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EvregError::EventCapacityExceeded { .. }
                | EvregError::FlagCapacityExceeded { .. }
                | EvregError::FlagOutOfRange { .. }
                | EvregError::FlagNotAvailable { .. }
                | EvregError::ParticipantContactMissing
                | EvregError::ParticipantEventMissing
                | EvregError::ParticipantOfferMissing
                | EvregError::OfferInactive(_)
                | EvregError::OfferNotPublic(_)
                | EvregError::RequiredOfferNotSatisfied { .. }
                | EvregError::TokenInvalid(_)
                | EvregError::Payment { .. }
                | EvregError::InvalidInput(_)
        )
    }

    /// Get error severity level for logging
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EvregError::Database(_) => ErrorSeverity::Critical,
            EvregError::Migration(_) => ErrorSeverity::Critical,
            EvregError::Config(_) => ErrorSeverity::Critical,
            EvregError::Io(_) => ErrorSeverity::Error,
            EvregError::Serialization(_) => ErrorSeverity::Error,
            EvregError::Csv(_) => ErrorSeverity::Warning,
            _ if self.is_user_facing() => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_error_message() {
        let err = EvregError::EventCapacityExceeded {
            offer: "conference-attendee".to_string(),
            usage: 2,
            capacity: 2,
        };
        let message = err.to_string();
        assert!(message.contains("conference-attendee"));
        assert!(message.contains("2 of 2"));
    }

    #[test]
    fn test_payment_error_short_message() {
        let err = EvregError::payment("no participant matches variable symbol 123", "unknown VS");
        match err {
            EvregError::Payment { ref short, .. } => assert_eq!(short, "unknown VS"),
            _ => panic!("expected payment error"),
        }
    }

    #[test]
    fn test_severity_classification() {
        let err = EvregError::FlagOutOfRange {
            flag: "tshirt-l".to_string(),
            count: 4,
            min: 1,
            max: "3".to_string(),
        };
        assert!(err.is_user_facing());
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert_eq!(
            EvregError::Config("missing url".to_string()).severity(),
            ErrorSeverity::Critical
        );
    }
}
