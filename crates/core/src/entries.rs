//! Validation for expense line items (receipts and time entries) and the
//! month-locking rule shared by all line items.

use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;
use crate::types::Cents;
use crate::workflow::Stage;

/// Maximum receipt upload size accepted by default (10 MiB).
pub const DEFAULT_MAX_RECEIPT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum receipt amount in cents.
pub const MAX_RECEIPT_AMOUNT_CENTS: Cents = 1_000_000;

/// Content types accepted for receipt uploads.
pub const RECEIPT_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/heic", "application/pdf"];

/// Receipt expense categories.
pub const RECEIPT_CATEGORIES: &[&str] = &[
    "fuel",
    "parking",
    "tolls",
    "meals",
    "lodging",
    "supplies",
    "other",
];

/// The report period (year, month) a dated line item belongs to.
pub fn report_period(date: NaiveDate) -> (i32, i32) {
    (date.year(), date.month() as i32)
}

/// Validate a report period.
pub fn validate_period(year: i32, month: i32) -> Result<(), CoreError> {
    if !(1..=12).contains(&month) {
        return Err(CoreError::Validation(format!(
            "Month must be between 1 and 12, got {month}"
        )));
    }
    if !(2000..=2100).contains(&year) {
        return Err(CoreError::Validation(format!("Year {year} is out of range")));
    }
    Ok(())
}

/// Line items of a month are editable until its report is submitted, and
/// again while the report is back with the employee for revision.
pub fn ensure_period_editable(report_stage: Option<Stage>) -> Result<(), CoreError> {
    match report_stage {
        None | Some(Stage::Employee) => Ok(()),
        Some(stage) => Err(CoreError::Conflict(format!(
            "The expense report for this month is locked (stage '{}')",
            stage.as_str()
        ))),
    }
}

/// Validate hours worked on a single day.
pub fn validate_hours(hours: f64) -> Result<(), CoreError> {
    if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
        return Err(CoreError::Validation(
            "Hours must be greater than 0 and at most 24".to_string(),
        ));
    }
    Ok(())
}

/// Validate a receipt amount.
pub fn validate_amount_cents(amount_cents: Cents) -> Result<(), CoreError> {
    if amount_cents <= 0 || amount_cents > MAX_RECEIPT_AMOUNT_CENTS {
        return Err(CoreError::Validation(format!(
            "Receipt amount must be between 1 and {MAX_RECEIPT_AMOUNT_CENTS} cents"
        )));
    }
    Ok(())
}

/// Validate a receipt category.
pub fn validate_receipt_category(category: &str) -> Result<(), CoreError> {
    if RECEIPT_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid receipt category '{category}'. Must be one of: {}",
            RECEIPT_CATEGORIES.join(", ")
        )))
    }
}

/// Validate the content type of an uploaded receipt file.
pub fn validate_receipt_content_type(content_type: &str) -> Result<(), CoreError> {
    if RECEIPT_CONTENT_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported receipt file type '{content_type}'"
        )))
    }
}

/// File extension used when storing a receipt of the given content type.
pub fn receipt_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/heic" => "heic",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}
