//! Participant payment repository implementation

use sqlx::PgPool;

use crate::models::payment::{CreatePaymentRequest, ParticipantPayment};
use crate::utils::errors::EvregError;

const PAYMENT_COLUMNS: &str =
    "id, participant_id, amount, payment_date, variable_symbol, currency, note, state, created_at";

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a payment against a participant
    pub async fn create(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<ParticipantPayment, EvregError> {
        let payment = sqlx::query_as::<_, ParticipantPayment>(
            r#"
            INSERT INTO participant_payments
                (participant_id, amount, payment_date, variable_symbol, currency, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, participant_id, amount, payment_date, variable_symbol, currency, note, state, created_at
            "#,
        )
        .bind(request.participant_id)
        .bind(request.amount)
        .bind(request.payment_date)
        .bind(request.variable_symbol)
        .bind(request.currency)
        .bind(request.note)
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    /// List payments of a participant
    pub async fn list_for_participant(
        &self,
        participant_id: i64,
    ) -> Result<Vec<ParticipantPayment>, EvregError> {
        let payments = sqlx::query_as::<_, ParticipantPayment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM participant_payments WHERE participant_id = $1 AND state = 'active' ORDER BY payment_date ASC"
        ))
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Authoritative sum of non-deleted payments for a participant
    pub async fn sum_for_participant(&self, participant_id: i64) -> Result<i64, EvregError> {
        let sum: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM participant_payments WHERE participant_id = $1 AND state = 'active'",
        )
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.0)
    }
}
