//! Payment tracking and CSV import service
//!
//! Parses bank CSV exports according to the configured column layout, matches
//! rows to participants by variable symbol, records payments and refreshes the
//! cached money fields. A failed row never aborts the import; it is collected
//! into the report instead.

use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::{PaymentImportConfig, Settings};
use crate::database::DatabaseService;
use crate::models::payment::{CreatePaymentRequest, ParticipantPayment, PaymentRow};
use crate::services::notification::{NotificationKind, NotificationService};
use crate::services::registration::RegistrationService;
use crate::utils::errors::{EvregError, Result};
use crate::utils::logging::log_payment;

/// Outcome of a CSV import run
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub applied: usize,
    pub failed: usize,
    /// Compact per-row failure descriptions, in row order
    pub issues: Vec<String>,
}

/// Payment import and matching service
#[derive(Clone)]
pub struct PaymentService {
    db: DatabaseService,
    registration: RegistrationService,
    notifications: NotificationService,
    settings: Settings,
}

impl PaymentService {
    /// Create a new PaymentService instance
    pub fn new(
        db: DatabaseService,
        registration: RegistrationService,
        notifications: NotificationService,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            registration,
            notifications,
            settings,
        }
    }

    /// Apply one parsed payment row
    ///
    /// Checks the currency, matches the variable symbol to a participant,
    /// records the payment, recomputes the participant's money fields and
    /// confirms the payment to the participant.
    pub async fn apply_payment(&self, row: &PaymentRow) -> Result<ParticipantPayment> {
        let allowed = &self.settings.payment_import.currency_allowed;
        if !row.currency.eq_ignore_ascii_case(allowed) {
            return Err(EvregError::payment(
                format!(
                    "payment in {} ignored, only {} is accepted (VS {})",
                    row.currency, allowed, row.variable_symbol
                ),
                "unsupported currency",
            ));
        }

        let participant = self
            .db
            .participants
            .find_by_variable_symbol(&row.variable_symbol)
            .await?
            .ok_or_else(|| {
                EvregError::payment(
                    format!("no participant matches variable symbol {}", row.variable_symbol),
                    "unknown variable symbol",
                )
            })?;

        let payment = self
            .db
            .payments
            .create(CreatePaymentRequest {
                participant_id: participant.id,
                amount: row.amount,
                payment_date: row.date,
                variable_symbol: row.variable_symbol.clone(),
                currency: row.currency.clone(),
                note: None,
            })
            .await?;

        let refreshed = self.registration.recalculate_money(participant.id).await?;

        let mut parameters = HashMap::new();
        parameters.insert("amount".to_string(), row.amount.to_string());
        parameters.insert("currency".to_string(), row.currency.clone());
        parameters.insert(
            "remaining".to_string(),
            (refreshed.price_total - refreshed.paid).to_string(),
        );
        self.notifications
            .notify(&refreshed, NotificationKind::PaymentReceived, &parameters)?;

        log_payment(participant.id, row.amount, &row.variable_symbol, true);
        Ok(payment)
    }

    /// Parse and apply a whole CSV export
    ///
    /// Row-level failures (parse errors, unknown variable symbols, rejected
    /// currencies) are collected into the report; only infrastructure errors
    /// abort the run.
    pub async fn import_reader<R: Read>(&self, reader: R) -> Result<ImportReport> {
        let rows = parse_payment_rows(&self.settings.payment_import, reader)?;

        let mut report = ImportReport::default();
        for (index, row) in rows.into_iter().enumerate() {
            let outcome = match row {
                Ok(row) => self.apply_payment(&row).await.map(|_| ()),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(()) => report.applied += 1,
                Err(err) if err.is_user_facing() || matches!(err, EvregError::Csv(_)) => {
                    warn!(row = index + 1, error = %err, "Payment row skipped");
                    report.failed += 1;
                    report.issues.push(format!("row {}: {}", index + 1, err));
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            applied = report.applied,
            failed = report.failed,
            "Payment import finished"
        );
        Ok(report)
    }
}

/// Parse a bank CSV export into payment rows
///
/// The header row names the columns; their positions are taken from the
/// configured column names. Each data row parses independently, so one
/// malformed row does not poison the rest.
pub fn parse_payment_rows<R: Read>(
    config: &PaymentImportConfig,
    reader: R,
) -> Result<Vec<Result<PaymentRow>>> {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(config.delimiter as u8)
        .quote(config.enclosure as u8)
        .flexible(true)
        .trim(csv::Trim::All);
    if let Some(escape) = config.escape {
        builder.escape(Some(escape as u8));
    }
    let mut csv_reader = builder.from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers.iter().position(|header| header == name).ok_or_else(|| {
            EvregError::payment(
                format!("column '{name}' missing from CSV header"),
                "missing column",
            )
        })
    };
    let symbol_index = column(&config.variable_symbol_column)?;
    let date_index = column(&config.date_column)?;
    let value_index = column(&config.value_column)?;
    let currency_index = column(&config.currency_column)?;

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let row = record
            .map_err(EvregError::from)
            .and_then(|record| parse_record(&record, symbol_index, date_index, value_index, currency_index));
        rows.push(row);
    }
    Ok(rows)
}

fn parse_record(
    record: &csv::StringRecord,
    symbol_index: usize,
    date_index: usize,
    value_index: usize,
    currency_index: usize,
) -> Result<PaymentRow> {
    let field = |index: usize, name: &str| -> Result<&str> {
        record.get(index).ok_or_else(|| {
            EvregError::payment(format!("row is missing the {name} field"), "short row")
        })
    };

    let variable_symbol = field(symbol_index, "variable symbol")?.to_string();
    if variable_symbol.is_empty() {
        return Err(EvregError::payment(
            "row has an empty variable symbol".to_string(),
            "empty variable symbol",
        ));
    }

    let date = parse_date(field(date_index, "date")?)?;
    let amount = parse_amount(field(value_index, "value")?)?;
    let currency = field(currency_index, "currency")?.to_string();

    Ok(PaymentRow {
        variable_symbol,
        date,
        amount,
        currency,
    })
}

/// Accepts ISO dates and the dotted day-first format bank exports use
fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
        .map_err(|_| {
            EvregError::payment(format!("unparseable payment date '{raw}'"), "bad date")
        })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| EvregError::payment("invalid payment date".to_string(), "bad date"))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

/// Accepts both decimal-comma and decimal-point amounts; rounds to whole
/// units half away from zero, staying in integer arithmetic throughout
fn parse_amount(raw: &str) -> Result<i32> {
    let bad =
        || EvregError::payment(format!("unparseable payment amount '{raw}'"), "bad amount");

    let normalized = raw.replace(' ', "").replace(',', ".");
    let (whole, fraction) = match normalized.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (normalized.as_str(), ""),
    };

    let (negative, digits) = match whole.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, whole.strip_prefix('+').unwrap_or(whole)),
    };
    if digits.is_empty() && fraction.is_empty() {
        return Err(bad());
    }
    if !digits.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(bad());
    }

    let mut value: i64 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| bad())?
    };
    if fraction.chars().next().is_some_and(|c| c >= '5') {
        value += 1;
    }
    if negative {
        value = -value;
    }

    i32::try_from(value).map_err(|_| {
        EvregError::payment(
            format!("payment amount '{raw}' out of range"),
            "amount out of range",
        )
    })
}
