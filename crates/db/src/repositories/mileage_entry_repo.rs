//! Repository for the `mileage_entries` table.

use sqlx::PgPool;
use mileage_core::types::DbId;

use crate::models::mileage::{CreateMileageEntry, MileageEntry};

const COLUMNS: &str = "id, employee_id, trip_date, start_location, end_location, purpose, \
                        miles, gps_point_count, cost_center, created_at, updated_at";

pub struct MileageEntryRepo;

impl MileageEntryRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateMileageEntry,
    ) -> Result<MileageEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO mileage_entries
                (employee_id, trip_date, start_location, end_location, purpose, miles,
                 gps_point_count, cost_center)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MileageEntry>(&query)
            .bind(input.employee_id)
            .bind(input.trip_date)
            .bind(&input.start_location)
            .bind(&input.end_location)
            .bind(&input.purpose)
            .bind(input.miles)
            .bind(input.gps_point_count)
            .bind(&input.cost_center)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MileageEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM mileage_entries WHERE id = $1");
        sqlx::query_as::<_, MileageEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Entries of one employee for a month, oldest trip first.
    pub async fn list_for_period(
        pool: &PgPool,
        employee_id: DbId,
        year: i32,
        month: i32,
    ) -> Result<Vec<MileageEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM mileage_entries
             WHERE employee_id = $1
               AND EXTRACT(YEAR FROM trip_date)::INT = $2
               AND EXTRACT(MONTH FROM trip_date)::INT = $3
             ORDER BY trip_date, id"
        );
        sqlx::query_as::<_, MileageEntry>(&query)
            .bind(employee_id)
            .bind(year)
            .bind(month)
            .fetch_all(pool)
            .await
    }

    /// Total miles of one employee for a month.
    pub async fn total_miles(
        pool: &PgPool,
        employee_id: DbId,
        year: i32,
        month: i32,
    ) -> Result<f64, sqlx::Error> {
        let (total,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(miles), 0)::DOUBLE PRECISION FROM mileage_entries
             WHERE employee_id = $1
               AND EXTRACT(YEAR FROM trip_date)::INT = $2
               AND EXTRACT(MONTH FROM trip_date)::INT = $3",
        )
        .bind(employee_id)
        .bind(year)
        .bind(month)
        .fetch_one(pool)
        .await?;
        Ok(total)
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM mileage_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
