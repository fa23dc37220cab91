//! Time entry model and DTOs.

use chrono::NaiveDate;
use mileage_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `time_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeEntry {
    pub id: DbId,
    pub employee_id: DbId,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
    pub cost_center: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateTimeEntry {
    pub employee_id: DbId,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
    pub cost_center: Option<String>,
}
