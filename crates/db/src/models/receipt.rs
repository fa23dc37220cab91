//! Receipt model and DTOs.

use chrono::NaiveDate;
use mileage_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `receipts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Receipt {
    pub id: DbId,
    pub employee_id: DbId,
    pub receipt_date: NaiveDate,
    pub vendor: String,
    pub amount_cents: i64,
    pub category: String,
    pub cost_center: Option<String>,
    /// Path relative to the upload directory.
    pub file_path: String,
    pub content_type: String,
    pub file_size_bytes: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateReceipt {
    pub employee_id: DbId,
    pub receipt_date: NaiveDate,
    pub vendor: String,
    pub amount_cents: i64,
    pub category: String,
    pub cost_center: Option<String>,
    pub file_path: String,
    pub content_type: String,
    pub file_size_bytes: i64,
}
