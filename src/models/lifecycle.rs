//! Entity lifecycle states
//!
//! Soft deletion is modeled as an explicit lifecycle enum rather than a
//! deletion timestamp; read operations take an explicit `include_deleted`
//! parameter wherever deleted rows can matter.

use serde::{Deserialize, Serialize};

/// Soft-delete lifecycle state threaded through every entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    Active,
    Deleted,
}

impl EntityState {
    pub fn is_deleted(&self) -> bool {
        matches!(self, EntityState::Deleted)
    }
}

/// Participant confirmation state
///
/// `Activated` is terminal for the registration flow; payments and flag edits
/// never revert it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activation_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
    Unconfirmed,
    Activated,
}

impl ActivationState {
    pub fn is_activated(&self) -> bool {
        matches!(self, ActivationState::Activated)
    }
}
