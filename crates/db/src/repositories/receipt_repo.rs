//! Repository for the `receipts` table.

use sqlx::PgPool;
use mileage_core::types::DbId;

use crate::models::receipt::{CreateReceipt, Receipt};

const COLUMNS: &str = "id, employee_id, receipt_date, vendor, amount_cents, category, \
                        cost_center, file_path, content_type, file_size_bytes, created_at, updated_at";

pub struct ReceiptRepo;

impl ReceiptRepo {
    pub async fn create(pool: &PgPool, input: &CreateReceipt) -> Result<Receipt, sqlx::Error> {
        let query = format!(
            "INSERT INTO receipts
                (employee_id, receipt_date, vendor, amount_cents, category, cost_center,
                 file_path, content_type, file_size_bytes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Receipt>(&query)
            .bind(input.employee_id)
            .bind(input.receipt_date)
            .bind(&input.vendor)
            .bind(input.amount_cents)
            .bind(&input.category)
            .bind(&input.cost_center)
            .bind(&input.file_path)
            .bind(&input.content_type)
            .bind(input.file_size_bytes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Receipt>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM receipts WHERE id = $1");
        sqlx::query_as::<_, Receipt>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Receipts of one employee for a month, oldest first.
    pub async fn list_for_period(
        pool: &PgPool,
        employee_id: DbId,
        year: i32,
        month: i32,
    ) -> Result<Vec<Receipt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM receipts
             WHERE employee_id = $1
               AND EXTRACT(YEAR FROM receipt_date)::INT = $2
               AND EXTRACT(MONTH FROM receipt_date)::INT = $3
             ORDER BY receipt_date, id"
        );
        sqlx::query_as::<_, Receipt>(&query)
            .bind(employee_id)
            .bind(year)
            .bind(month)
            .fetch_all(pool)
            .await
    }

    /// Delete a receipt row, returning it so the caller can remove the file.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Receipt>, sqlx::Error> {
        let query = format!("DELETE FROM receipts WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Receipt>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
