//! Mileage entry model and DTOs.

use chrono::NaiveDate;
use mileage_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `mileage_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MileageEntry {
    pub id: DbId,
    pub employee_id: DbId,
    pub trip_date: NaiveDate,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub purpose: String,
    pub miles: f64,
    pub gps_point_count: i32,
    pub cost_center: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. `miles` has already been computed or validated.
#[derive(Debug, Clone)]
pub struct CreateMileageEntry {
    pub employee_id: DbId,
    pub trip_date: NaiveDate,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub purpose: String,
    pub miles: f64,
    pub gps_point_count: i32,
    pub cost_center: Option<String>,
}
