//! Event repository implementation

use chrono::Utc;
use sqlx::PgPool;

use crate::models::event::{CreateEventRequest, Event, UpdateEventRequest};
use crate::models::lifecycle::EntityState;
use crate::utils::errors::EvregError;

const EVENT_COLUMNS: &str = "id, slug, name, start_date_time, end_date_time, super_event_id, series_id, event_type, public_on_web, state, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event, EvregError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (slug, name, start_date_time, end_date_time, super_event_id, series_id, event_type, public_on_web, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, slug, name, start_date_time, end_date_time, super_event_id, series_id, event_type, public_on_web, state, created_at, updated_at
            "#
        )
        .bind(request.slug)
        .bind(request.name)
        .bind(request.start_date_time)
        .bind(request.end_date_time)
        .bind(request.super_event_id)
        .bind(request.series_id)
        .bind(request.event_type)
        .bind(request.public_on_web)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(
        &self,
        id: i64,
        include_deleted: bool,
    ) -> Result<Option<Event>, EvregError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND (state = 'active' OR $2)"
        ))
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by slug, optionally restricted to publicly visible events
    pub async fn find_by_slug(
        &self,
        slug: &str,
        only_public: bool,
        include_deleted: bool,
    ) -> Result<Option<Event>, EvregError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE slug = $1
              AND (public_on_web = TRUE OR NOT $2)
              AND (state = 'active' OR $3)
            "#
        ))
        .bind(slug)
        .bind(only_public)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// List all events, used to build the event tree
    pub async fn list_all(&self, include_deleted: bool) -> Result<Vec<Event>, EvregError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE (state = 'active' OR $1) ORDER BY id ASC"
        ))
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// List direct sub-events of an event
    pub async fn list_sub_events(&self, parent_id: i64) -> Result<Vec<Event>, EvregError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE super_event_id = $1 AND state = 'active' ORDER BY id ASC"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Update event attributes
    pub async fn update(&self, id: i64, request: UpdateEventRequest) -> Result<Event, EvregError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET name = COALESCE($2, name),
                start_date_time = COALESCE($3, start_date_time),
                end_date_time = COALESCE($4, end_date_time),
                super_event_id = COALESCE($5, super_event_id),
                event_type = COALESCE($6, event_type),
                public_on_web = COALESCE($7, public_on_web),
                updated_at = $8
            WHERE id = $1
            RETURNING id, slug, name, start_date_time, end_date_time, super_event_id, series_id, event_type, public_on_web, state, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(request.name)
        .bind(request.start_date_time)
        .bind(request.end_date_time)
        .bind(request.super_event_id)
        .bind(request.event_type)
        .bind(request.public_on_web)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Soft-delete an event; usage history is preserved
    pub async fn soft_delete(&self, id: i64) -> Result<(), EvregError> {
        sqlx::query("UPDATE events SET state = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(EntityState::Deleted)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
