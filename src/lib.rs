//! Evreg registration engine
//!
//! Event-registration and calendar management core: hierarchical events with
//! two-tier capacities, per-category registration offers, flag-based options
//! with amount ranges and price deltas, a token-driven activation workflow
//! and payment matching from bank CSV exports. The web surface and mail
//! delivery live outside this crate; they plug in through the repositories
//! and the notification gateway.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{EvregError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
