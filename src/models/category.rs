//! Participant category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::lifecycle::EntityState;

/// Classification of participants (attendee, organizer, ...)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantCategory {
    pub id: i64,
    pub slug: String,
    pub name: String,
    /// Type string used for filtering, e.g. "attendee"
    pub category_type: String,
    pub state: EntityState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub slug: String,
    pub name: String,
    pub category_type: String,
}
