//! Shared helpers for integration tests

pub mod database_helper;
pub mod test_data;

pub use database_helper::TestDatabase;
pub use test_data::{extract_token, seed_flag_offer, seed_offer, RecordingGateway, TestContext};
