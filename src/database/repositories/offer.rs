//! Registration offer repository implementation
//!
//! Candidate listings are ordered by ascending id so offer resolution has a
//! stable, deterministic tie-break: the first created offer wins.

use chrono::Utc;
use sqlx::PgPool;

use crate::models::capacity::Capacity;
use crate::models::lifecycle::EntityState;
use crate::models::offer::{CreateOfferRequest, RegistrationOffer, UpdateOfferRequest};
use crate::models::price::Price;
use crate::utils::errors::EvregError;

const OFFER_COLUMNS: &str = "id, slug, event_id, category_id, required_offer_id, start_date_time, end_date_time, public_on_web, base_capacity, full_capacity, base_usage, full_usage, price, deposit, state, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct OfferRepository {
    pool: PgPool,
}

impl OfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new registration offer; capacity and price inputs are clamped
    /// to their invariants before the write
    pub async fn create(
        &self,
        request: CreateOfferRequest,
    ) -> Result<RegistrationOffer, EvregError> {
        let capacity = Capacity::new(request.base_capacity, request.full_capacity);
        let price = Price::new(request.price, request.deposit);

        let offer = sqlx::query_as::<_, RegistrationOffer>(
            r#"
            INSERT INTO registration_offers
                (slug, event_id, category_id, required_offer_id, start_date_time, end_date_time,
                 public_on_web, base_capacity, full_capacity, price, deposit, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, slug, event_id, category_id, required_offer_id, start_date_time, end_date_time, public_on_web, base_capacity, full_capacity, base_usage, full_usage, price, deposit, state, created_at, updated_at
            "#,
        )
        .bind(request.slug)
        .bind(request.event_id)
        .bind(request.category_id)
        .bind(request.required_offer_id)
        .bind(request.start_date_time)
        .bind(request.end_date_time)
        .bind(request.public_on_web)
        .bind(capacity.base())
        .bind(capacity.full())
        .bind(price.price())
        .bind(price.deposit())
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(offer)
    }

    /// Find offer by ID
    pub async fn find_by_id(
        &self,
        id: i64,
        include_deleted: bool,
    ) -> Result<Option<RegistrationOffer>, EvregError> {
        let offer = sqlx::query_as::<_, RegistrationOffer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM registration_offers WHERE id = $1 AND (state = 'active' OR $2)"
        ))
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    /// Find offer by slug
    pub async fn find_by_slug(
        &self,
        slug: &str,
        only_public: bool,
    ) -> Result<Option<RegistrationOffer>, EvregError> {
        let offer = sqlx::query_as::<_, RegistrationOffer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM registration_offers
            WHERE slug = $1
              AND (public_on_web = TRUE OR NOT $2)
              AND state = 'active'
            "#
        ))
        .bind(slug)
        .bind(only_public)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    /// List offers for a set of events, optionally filtered by participant
    /// category type and public visibility, ordered by ascending id
    pub async fn list_for_events(
        &self,
        event_ids: &[i64],
        participant_type: Option<&str>,
        only_public: bool,
        include_deleted: bool,
    ) -> Result<Vec<RegistrationOffer>, EvregError> {
        let offers = sqlx::query_as::<_, RegistrationOffer>(
            r#"
            SELECT o.id, o.slug, o.event_id, o.category_id, o.required_offer_id,
                   o.start_date_time, o.end_date_time, o.public_on_web,
                   o.base_capacity, o.full_capacity, o.base_usage, o.full_usage,
                   o.price, o.deposit, o.state, o.created_at, o.updated_at
            FROM registration_offers o
            JOIN participant_categories c ON c.id = o.category_id
            WHERE o.event_id = ANY($1)
              AND ($2::TEXT IS NULL OR c.category_type = $2)
              AND (o.public_on_web = TRUE OR NOT $3)
              AND (o.state = 'active' OR $4)
            ORDER BY o.id ASC
            "#,
        )
        .bind(event_ids)
        .bind(participant_type)
        .bind(only_public)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        Ok(offers)
    }

    /// Authoritative participant count for an offer
    pub async fn count_participants(
        &self,
        offer_id: i64,
        include_deleted: bool,
    ) -> Result<i64, EvregError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM participants WHERE offer_id = $1 AND (state = 'active' OR $2)",
        )
        .bind(offer_id)
        .bind(include_deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Write recomputed usage counters back to the offer
    pub async fn update_usage(&self, offer_id: i64, base: i32, full: i32) -> Result<(), EvregError> {
        sqlx::query(
            "UPDATE registration_offers SET base_usage = $2, full_usage = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(offer_id)
        .bind(base)
        .bind(full)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Update offer attributes; capacity and price edits are re-clamped
    /// against the stored values
    pub async fn update(
        &self,
        id: i64,
        request: UpdateOfferRequest,
    ) -> Result<RegistrationOffer, EvregError> {
        let current = self
            .find_by_id(id, true)
            .await?
            .ok_or_else(|| EvregError::OfferNotFound(id.to_string()))?;

        let mut capacity = current.capacity;
        capacity.set_capacity(
            request.base_capacity.unwrap_or(capacity.base()),
            request.full_capacity.unwrap_or(capacity.full()),
        );
        let mut price = current.price;
        price.set_price(
            request.price.or(price.price()),
            request.deposit.or(price.deposit()),
        );

        let offer = sqlx::query_as::<_, RegistrationOffer>(
            r#"
            UPDATE registration_offers
            SET start_date_time = COALESCE($2, start_date_time),
                end_date_time = COALESCE($3, end_date_time),
                public_on_web = COALESCE($4, public_on_web),
                base_capacity = $5,
                full_capacity = $6,
                price = $7,
                deposit = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING id, slug, event_id, category_id, required_offer_id, start_date_time, end_date_time, public_on_web, base_capacity, full_capacity, base_usage, full_usage, price, deposit, state, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(request.start_date_time)
        .bind(request.end_date_time)
        .bind(request.public_on_web)
        .bind(capacity.base())
        .bind(capacity.full())
        .bind(price.price())
        .bind(price.deposit())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(offer)
    }

    /// Soft-delete an offer
    pub async fn soft_delete(&self, id: i64) -> Result<(), EvregError> {
        sqlx::query("UPDATE registration_offers SET state = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(EntityState::Deleted)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
