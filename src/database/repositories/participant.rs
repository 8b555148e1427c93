//! Participant repository implementation
//!
//! Participant creation inserts the participant, its flag groups and one
//! participant-flag row per selected unit inside a single transaction, so a
//! failed flag insert never leaves a half-registered participant behind.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::lifecycle::{ActivationState, EntityState};
use crate::models::participant::{
    FlagSelection, Participant, ParticipantFlagGroup, ParticipantToken,
};
use crate::utils::errors::EvregError;

const PARTICIPANT_COLUMNS: &str = "id, offer_id, event_id, contact_id, activation_state, notes, price_total, deposit_total, paid, variable_symbol, state, created_at, updated_at";

const TOKEN_COLUMNS: &str =
    "id, participant_id, token, token_type, expires_at, consumed_at, created_at";

/// Column values for a new participant row
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub offer_id: i64,
    pub event_id: i64,
    pub contact_id: Option<i64>,
    pub notes: Option<String>,
    pub price_total: i32,
    pub deposit_total: i32,
    pub variable_symbol: String,
}

#[derive(Debug, Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a participant together with its flag selections, transactionally
    pub async fn create(
        &self,
        new: NewParticipant,
        selections: &[FlagSelection],
    ) -> Result<Participant, EvregError> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let participant = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants
                (offer_id, event_id, contact_id, notes, price_total, deposit_total, variable_symbol, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, offer_id, event_id, contact_id, activation_state, notes, price_total, deposit_total, paid, variable_symbol, state, created_at, updated_at
            "#,
        )
        .bind(new.offer_id)
        .bind(new.event_id)
        .bind(new.contact_id)
        .bind(new.notes)
        .bind(new.price_total)
        .bind(new.deposit_total)
        .bind(new.variable_symbol)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        insert_flag_groups(&mut tx, participant.id, selections).await?;

        tx.commit().await?;

        Ok(participant)
    }

    /// Replace a participant's flag selections transactionally
    ///
    /// Existing groups and unit rows are soft-deleted, so usage recomputation
    /// still sees which flag offers the participant used to reference; the
    /// new groups and unit rows land in the same transaction.
    pub async fn replace_flag_groups(
        &self,
        participant_id: i64,
        selections: &[FlagSelection],
    ) -> Result<(), EvregError> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        sqlx::query(
            "UPDATE participant_flag_groups SET state = 'deleted' WHERE participant_id = $1 AND state = 'active'",
        )
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE participant_flags SET state = 'deleted' WHERE participant_id = $1 AND state = 'active'",
        )
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;

        insert_flag_groups(&mut tx, participant_id, selections).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Find participant by ID
    pub async fn find_by_id(
        &self,
        id: i64,
        include_deleted: bool,
    ) -> Result<Option<Participant>, EvregError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1 AND (state = 'active' OR $2)"
        ))
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    /// Find participant by variable symbol, used by payment matching
    pub async fn find_by_variable_symbol(
        &self,
        variable_symbol: &str,
    ) -> Result<Option<Participant>, EvregError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE variable_symbol = $1 AND state = 'active' ORDER BY id ASC LIMIT 1"
        ))
        .bind(variable_symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    /// List participants registered through an offer
    pub async fn list_for_offer(
        &self,
        offer_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<Participant>, EvregError> {
        let participants = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE offer_id = $1 AND (state = 'active' OR $2) ORDER BY id ASC"
        ))
        .bind(offer_id)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    /// List participants across a set of events (an event and its sub-events)
    pub async fn list_for_events(
        &self,
        event_ids: &[i64],
        include_deleted: bool,
    ) -> Result<Vec<Participant>, EvregError> {
        let participants = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = ANY($1) AND (state = 'active' OR $2) ORDER BY id ASC"
        ))
        .bind(event_ids)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    /// Whether a contact already holds a non-deleted registration on an offer
    pub async fn exists_for_offer_and_contact(
        &self,
        offer_id: i64,
        contact_id: i64,
    ) -> Result<bool, EvregError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM participants WHERE offer_id = $1 AND contact_id = $2 AND state = 'active'",
        )
        .bind(offer_id)
        .bind(contact_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    /// Flag groups of a participant
    pub async fn list_flag_groups(
        &self,
        participant_id: i64,
    ) -> Result<Vec<ParticipantFlagGroup>, EvregError> {
        let groups = sqlx::query_as::<_, ParticipantFlagGroup>(
            "SELECT id, participant_id, flag_offer_id, amount, state FROM participant_flag_groups WHERE participant_id = $1 AND state = 'active' ORDER BY id ASC",
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    /// Overwrite the cached money fields
    pub async fn update_money(
        &self,
        id: i64,
        price_total: i32,
        deposit_total: i32,
        paid: i32,
    ) -> Result<(), EvregError> {
        sqlx::query(
            "UPDATE participants SET price_total = $2, deposit_total = $3, paid = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(price_total)
        .bind(deposit_total)
        .bind(paid)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set the activation state
    pub async fn set_activation_state(
        &self,
        id: i64,
        state: ActivationState,
    ) -> Result<(), EvregError> {
        sqlx::query("UPDATE participants SET activation_state = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(state)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Soft-delete a participant and its flag selections
    pub async fn soft_delete(&self, id: i64) -> Result<(), EvregError> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        sqlx::query("UPDATE participants SET state = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(EntityState::Deleted)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE participant_flag_groups SET state = $2 WHERE participant_id = $1")
            .bind(id)
            .bind(EntityState::Deleted)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE participant_flags SET state = $2 WHERE participant_id = $1")
            .bind(id)
            .bind(EntityState::Deleted)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Store a newly issued token
    pub async fn insert_token(
        &self,
        participant_id: i64,
        token: &str,
        token_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ParticipantToken, EvregError> {
        let stored = sqlx::query_as::<_, ParticipantToken>(
            r#"
            INSERT INTO participant_tokens (participant_id, token, token_type, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, participant_id, token, token_type, expires_at, consumed_at, created_at
            "#,
        )
        .bind(participant_id)
        .bind(token)
        .bind(token_type)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Look up a presented token for a participant
    pub async fn find_token(
        &self,
        participant_id: i64,
        token: &str,
    ) -> Result<Option<ParticipantToken>, EvregError> {
        let stored = sqlx::query_as::<_, ParticipantToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM participant_tokens WHERE participant_id = $1 AND token = $2 ORDER BY id DESC LIMIT 1"
        ))
        .bind(participant_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Mark a token consumed; single-use is enforced through this timestamp
    pub async fn mark_token_consumed(&self, token_id: i64) -> Result<(), EvregError> {
        sqlx::query("UPDATE participant_tokens SET consumed_at = $2 WHERE id = $1")
            .bind(token_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Insert flag groups and their per-unit rows inside an open transaction
async fn insert_flag_groups(
    tx: &mut Transaction<'_, Postgres>,
    participant_id: i64,
    selections: &[FlagSelection],
) -> Result<(), EvregError> {
    for selection in selections {
        let group_id: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO participant_flag_groups (participant_id, flag_offer_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(participant_id)
        .bind(selection.flag_offer_id)
        .bind(selection.count)
        .fetch_one(&mut **tx)
        .await?;

        for _ in 0..selection.count {
            sqlx::query(
                r#"
                INSERT INTO participant_flags (group_id, participant_id, flag_offer_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(group_id.0)
            .bind(participant_id)
            .bind(selection.flag_offer_id)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}
