//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub registration: RegistrationConfig,
    pub payment_import: PaymentImportConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Registration workflow configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrationConfig {
    /// Validity window for activation tokens, in hours
    pub token_ttl_hours: i64,
    /// Default recursion depth for sub-event traversal; None walks the whole tree
    pub default_recursion_depth: Option<usize>,
    /// Whether ordinary registrations may consume the full/overflow capacity
    /// tier. The overflow tier is a manager override; this stays false unless
    /// a deployment explicitly opts in.
    pub allow_full_capacity_public: bool,
}

/// Payment CSV import configuration
///
/// Parsing format is the import collaborator's configuration surface; the
/// engine only matches variable symbols to participants and applies amounts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentImportConfig {
    pub delimiter: char,
    pub enclosure: char,
    pub escape: Option<char>,
    pub variable_symbol_column: String,
    pub date_column: String,
    pub value_column: String,
    pub currency_column: String,
    pub currency_allowed: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub max_files: u32,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("EVREG"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EvregError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/evreg".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            registration: RegistrationConfig {
                token_ttl_hours: 48,
                default_recursion_depth: Some(5),
                allow_full_capacity_public: false,
            },
            payment_import: PaymentImportConfig {
                delimiter: ';',
                enclosure: '"',
                escape: None,
                variable_symbol_column: "VS".to_string(),
                date_column: "Datum".to_string(),
                value_column: "Objem".to_string(),
                currency_column: "Mena".to_string(),
                currency_allowed: "CZK".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/evreg".to_string(),
                max_files: 5,
            },
        }
    }
}
