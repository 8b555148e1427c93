//! Participant category repository implementation

use sqlx::PgPool;

use crate::models::category::{CreateCategoryRequest, ParticipantCategory};
use crate::utils::errors::EvregError;

const CATEGORY_COLUMNS: &str = "id, slug, name, category_type, state, created_at";

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new participant category
    pub async fn create(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<ParticipantCategory, EvregError> {
        let category = sqlx::query_as::<_, ParticipantCategory>(
            r#"
            INSERT INTO participant_categories (slug, name, category_type)
            VALUES ($1, $2, $3)
            RETURNING id, slug, name, category_type, state, created_at
            "#,
        )
        .bind(request.slug)
        .bind(request.name)
        .bind(request.category_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    /// Find category by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ParticipantCategory>, EvregError> {
        let category = sqlx::query_as::<_, ParticipantCategory>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM participant_categories WHERE id = $1 AND state = 'active'"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Find category by slug
    pub async fn find_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ParticipantCategory>, EvregError> {
        let category = sqlx::query_as::<_, ParticipantCategory>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM participant_categories WHERE slug = $1 AND state = 'active'"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// List categories of a given type, e.g. "attendee"
    pub async fn list_by_type(
        &self,
        category_type: &str,
    ) -> Result<Vec<ParticipantCategory>, EvregError> {
        let categories = sqlx::query_as::<_, ParticipantCategory>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM participant_categories WHERE category_type = $1 AND state = 'active' ORDER BY id ASC"
        ))
        .bind(category_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
