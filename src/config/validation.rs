//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{EvregError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_registration_config(&settings.registration)?;
    validate_payment_import_config(&settings.payment_import)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EvregError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(EvregError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EvregError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate registration configuration
fn validate_registration_config(config: &super::RegistrationConfig) -> Result<()> {
    if config.token_ttl_hours <= 0 {
        return Err(EvregError::Config(
            "Token TTL must be greater than 0 hours".to_string(),
        ));
    }

    if config.default_recursion_depth == Some(0) {
        return Err(EvregError::Config(
            "Recursion depth must be at least 1 when set; omit it to walk the whole tree"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate payment import configuration
fn validate_payment_import_config(config: &super::PaymentImportConfig) -> Result<()> {
    if config.variable_symbol_column.is_empty()
        || config.date_column.is_empty()
        || config.value_column.is_empty()
        || config.currency_column.is_empty()
    {
        return Err(EvregError::Config(
            "All payment import column names are required".to_string(),
        ));
    }

    if config.currency_allowed.is_empty() {
        return Err(EvregError::Config(
            "An allowed payment currency is required".to_string(),
        ));
    }

    if !config.delimiter.is_ascii() || !config.enclosure.is_ascii() {
        return Err(EvregError::Config(
            "CSV delimiter and enclosure must be ASCII characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EvregError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EvregError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_zero_token_ttl_rejected() {
        let mut settings = Settings::default();
        settings.registration.token_ttl_hours = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_missing_import_column_rejected() {
        let mut settings = Settings::default();
        settings.payment_import.variable_symbol_column = String::new();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
