//! Registration flag repository implementation
//!
//! Flag offers are read as `FlagOfferView` rows joining the flag and its
//! category, which is what the flag engine validates and aggregates over.

use sqlx::PgPool;

use crate::models::amount_range::AmountRange;
use crate::models::capacity::Capacity;
use crate::models::flag::{
    CreateFlagCategoryRequest, CreateFlagOfferRequest, CreateFlagRequest, FlagOfferView,
    RegistrationFlag, RegistrationFlagCategory, RegistrationFlagOffer,
};
use crate::models::price::Price;
use crate::utils::errors::EvregError;

const FLAG_OFFER_VIEW: &str = r#"
    SELECT fo.id, fo.flag_id, fo.offer_id, fo.public_on_web,
           fo.base_capacity, fo.full_capacity, fo.base_usage, fo.full_usage,
           fo.min_amount, fo.max_amount, fo.state,
           f.slug AS flag_slug, f.name AS flag_name, c.slug AS category_slug,
           f.price AS flag_price, f.deposit AS flag_deposit
    FROM registration_flag_offers fo
    JOIN registration_flags f ON f.id = fo.flag_id
    JOIN flag_categories c ON c.id = f.category_id
"#;

#[derive(Debug, Clone)]
pub struct FlagRepository {
    pool: PgPool,
}

impl FlagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a flag category
    pub async fn create_category(
        &self,
        request: CreateFlagCategoryRequest,
    ) -> Result<RegistrationFlagCategory, EvregError> {
        let category = sqlx::query_as::<_, RegistrationFlagCategory>(
            r#"
            INSERT INTO flag_categories (slug, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, slug, name, description, state
            "#,
        )
        .bind(request.slug)
        .bind(request.name)
        .bind(request.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    /// Create a flag; the deposit delta is clamped to the price delta
    pub async fn create_flag(
        &self,
        request: CreateFlagRequest,
    ) -> Result<RegistrationFlag, EvregError> {
        let price = Price::new(request.price, request.deposit);

        let flag = sqlx::query_as::<_, RegistrationFlag>(
            r#"
            INSERT INTO registration_flags (slug, name, category_id, price, deposit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, slug, name, category_id, price, deposit, state
            "#,
        )
        .bind(request.slug)
        .bind(request.name)
        .bind(request.category_id)
        .bind(price.price())
        .bind(price.deposit())
        .fetch_one(&self.pool)
        .await?;

        Ok(flag)
    }

    /// Bind a flag to an offer; capacity and range inputs are clamped first
    pub async fn create_flag_offer(
        &self,
        request: CreateFlagOfferRequest,
    ) -> Result<RegistrationFlagOffer, EvregError> {
        let capacity = Capacity::new(request.base_capacity, request.full_capacity);
        let range = AmountRange::new(request.min_amount, request.max_amount);

        let flag_offer = sqlx::query_as::<_, RegistrationFlagOffer>(
            r#"
            INSERT INTO registration_flag_offers
                (flag_id, offer_id, public_on_web, base_capacity, full_capacity, min_amount, max_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, flag_id, offer_id, public_on_web, base_capacity, full_capacity, base_usage, full_usage, min_amount, max_amount, state
            "#,
        )
        .bind(request.flag_id)
        .bind(request.offer_id)
        .bind(request.public_on_web)
        .bind(capacity.base())
        .bind(capacity.full())
        .bind(range.min())
        .bind(range.max())
        .fetch_one(&self.pool)
        .await?;

        Ok(flag_offer)
    }

    /// Find a flag offer with its flag and category context
    pub async fn find_flag_offer(&self, id: i64) -> Result<Option<FlagOfferView>, EvregError> {
        let view = sqlx::query_as::<_, FlagOfferView>(&format!(
            "{FLAG_OFFER_VIEW} WHERE fo.id = $1 AND fo.state = 'active'"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(view)
    }

    /// List flag offers applicable to an offer, ordered by ascending id
    pub async fn list_for_offer(
        &self,
        offer_id: i64,
        only_public: bool,
    ) -> Result<Vec<FlagOfferView>, EvregError> {
        let views = sqlx::query_as::<_, FlagOfferView>(&format!(
            r#"
            {FLAG_OFFER_VIEW}
            WHERE fo.offer_id = $1
              AND (fo.public_on_web = TRUE OR NOT $2)
              AND fo.state = 'active'
            ORDER BY fo.id ASC
            "#
        ))
        .bind(offer_id)
        .bind(only_public)
        .fetch_all(&self.pool)
        .await?;

        Ok(views)
    }

    /// Authoritative count of non-deleted participant flags referencing a
    /// flag offer
    pub async fn count_selections(&self, flag_offer_id: i64) -> Result<i64, EvregError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM participant_flags pf
            JOIN participants p ON p.id = pf.participant_id
            WHERE pf.flag_offer_id = $1
              AND pf.state = 'active'
              AND p.state = 'active'
            "#,
        )
        .bind(flag_offer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Write recomputed usage counters back to the flag offer
    pub async fn update_flag_offer_usage(
        &self,
        flag_offer_id: i64,
        base: i32,
        full: i32,
    ) -> Result<(), EvregError> {
        sqlx::query(
            "UPDATE registration_flag_offers SET base_usage = $2, full_usage = $3 WHERE id = $1",
        )
        .bind(flag_offer_id)
        .bind(base)
        .bind(full)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Flag offer ids referenced by a participant's selections
    pub async fn flag_offer_ids_for_participant(
        &self,
        participant_id: i64,
    ) -> Result<Vec<i64>, EvregError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT flag_offer_id FROM participant_flag_groups WHERE participant_id = $1",
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Soft-delete a flag offer
    pub async fn soft_delete_flag_offer(&self, id: i64) -> Result<(), EvregError> {
        sqlx::query("UPDATE registration_flag_offers SET state = 'deleted' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
