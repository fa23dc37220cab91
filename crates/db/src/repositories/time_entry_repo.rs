//! Repository for the `time_entries` table.

use sqlx::PgPool;
use mileage_core::types::DbId;

use crate::models::time_entry::{CreateTimeEntry, TimeEntry};

const COLUMNS: &str =
    "id, employee_id, work_date, hours, description, cost_center, created_at, updated_at";

pub struct TimeEntryRepo;

impl TimeEntryRepo {
    pub async fn create(pool: &PgPool, input: &CreateTimeEntry) -> Result<TimeEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO time_entries (employee_id, work_date, hours, description, cost_center)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimeEntry>(&query)
            .bind(input.employee_id)
            .bind(input.work_date)
            .bind(input.hours)
            .bind(&input.description)
            .bind(&input.cost_center)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TimeEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM time_entries WHERE id = $1");
        sqlx::query_as::<_, TimeEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_period(
        pool: &PgPool,
        employee_id: DbId,
        year: i32,
        month: i32,
    ) -> Result<Vec<TimeEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM time_entries
             WHERE employee_id = $1
               AND EXTRACT(YEAR FROM work_date)::INT = $2
               AND EXTRACT(MONTH FROM work_date)::INT = $3
             ORDER BY work_date, id"
        );
        sqlx::query_as::<_, TimeEntry>(&query)
            .bind(employee_id)
            .bind(year)
            .bind(month)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM time_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
