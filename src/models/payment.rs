//! Participant payment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::lifecycle::EntityState;

/// A monetary transaction applied against a participant's remaining amounts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantPayment {
    pub id: i64,
    pub participant_id: i64,
    pub amount: i32,
    pub payment_date: DateTime<Utc>,
    pub variable_symbol: String,
    pub currency: String,
    pub note: Option<String>,
    pub state: EntityState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub participant_id: i64,
    pub amount: i32,
    pub payment_date: DateTime<Utc>,
    pub variable_symbol: String,
    pub currency: String,
    pub note: Option<String>,
}

/// One parsed row of a bank CSV export, as handed over by the import parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRow {
    pub variable_symbol: String,
    pub date: DateTime<Utc>,
    pub amount: i32,
    pub currency: String,
}
