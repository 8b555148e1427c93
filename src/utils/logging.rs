//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the registration engine.

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "evreg.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(())
}

/// Log registration attempts with structured data
pub fn log_registration(offer_id: i64, event_id: i64, contact_id: Option<i64>, success: bool) {
    if success {
        info!(
            offer_id = offer_id,
            event_id = event_id,
            contact_id = contact_id,
            "Participant registered"
        );
    } else {
        warn!(
            offer_id = offer_id,
            event_id = event_id,
            contact_id = contact_id,
            "Participant registration rejected"
        );
    }
}

/// Log capacity checks
pub fn log_capacity_check(offer_id: i64, usage: i32, capacity: i32, use_full: bool) {
    debug!(
        offer_id = offer_id,
        usage = usage,
        capacity = capacity,
        use_full = use_full,
        "Capacity check performed"
    );
}

/// Log usage counter recomputation
pub fn log_usage_update(entity: &str, id: i64, usage: i32) {
    debug!(entity = entity, id = id, usage = usage, "Usage counter recomputed");
}

/// Log payment application
pub fn log_payment(participant_id: i64, amount: i32, variable_symbol: &str, success: bool) {
    if success {
        info!(
            participant_id = participant_id,
            amount = amount,
            variable_symbol = variable_symbol,
            "Payment applied"
        );
    } else {
        warn!(
            participant_id = participant_id,
            amount = amount,
            variable_symbol = variable_symbol,
            "Payment application failed"
        );
    }
}
