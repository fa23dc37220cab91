//! Handlers for the `/receipts` resource.
//!
//! Receipts are uploaded as multipart forms. The file is written under the
//! configured upload directory and only its relative path is stored.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use mileage_core::cost_centers::validate_cost_center;
use mileage_core::entries::{
    receipt_extension, report_period, validate_amount_cents, validate_receipt_category,
    validate_receipt_content_type,
};
use mileage_core::error::CoreError;
use mileage_core::types::DbId;
use mileage_db::models::receipt::{CreateReceipt, Receipt};
use mileage_db::repositories::ReceiptRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{
    ensure_month_editable, ensure_owner_or_admin, load_caller, resolve_period, resolve_subject,
};
use crate::middleware::auth::AuthUser;
use crate::query::PeriodParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Fields collected from the upload form.
#[derive(Debug, Default)]
struct ReceiptForm {
    file: Option<(String, Vec<u8>)>,
    receipt_date: Option<String>,
    vendor: Option<String>,
    amount_cents: Option<String>,
    category: Option<String>,
    cost_center: Option<String>,
}

/// A validated upload, ready to be written and stored.
#[derive(Debug)]
struct ReceiptUpload {
    content_type: String,
    data: Vec<u8>,
    receipt_date: NaiveDate,
    vendor: String,
    amount_cents: i64,
    category: String,
    cost_center: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, CoreError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::Validation(format!("Missing required '{field}' field")))
}

impl ReceiptForm {
    fn validate(self, max_bytes: usize) -> Result<ReceiptUpload, CoreError> {
        let (content_type, data) = self
            .file
            .ok_or_else(|| CoreError::Validation("Missing required 'file' field".into()))?;
        validate_receipt_content_type(&content_type)?;
        if data.is_empty() {
            return Err(CoreError::Validation("Receipt file is empty".into()));
        }
        if data.len() > max_bytes {
            return Err(CoreError::Validation(format!(
                "Receipt file exceeds the {max_bytes} byte limit"
            )));
        }

        let receipt_date = required(self.receipt_date, "receipt_date")?
            .parse::<NaiveDate>()
            .map_err(|_| CoreError::Validation("receipt_date must be YYYY-MM-DD".into()))?;
        let vendor = required(self.vendor, "vendor")?;
        let amount_cents = required(self.amount_cents, "amount_cents")?
            .parse::<i64>()
            .map_err(|_| CoreError::Validation("amount_cents must be an integer".into()))?;
        validate_amount_cents(amount_cents)?;
        let category = required(self.category, "category")?;
        validate_receipt_category(&category)?;
        let cost_center = self
            .cost_center
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(cc) = &cost_center {
            validate_cost_center(cc)?;
        }

        Ok(ReceiptUpload {
            content_type,
            data,
            receipt_date,
            vendor,
            amount_cents,
            category,
            cost_center,
        })
    }
}

/// GET /api/v1/receipts
pub async fn list_receipts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<DataResponse<Vec<Receipt>>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    let subject = resolve_subject(&state.pool, &caller, params.employee_id).await?;
    let (year, month) = resolve_period(params.year, params.month)?;

    let receipts = ReceiptRepo::list_for_period(&state.pool, subject.id, year, month).await?;
    Ok(Json(DataResponse { data: receipts }))
}

/// POST /api/v1/receipts
///
/// Multipart form: `file`, `receipt_date`, `vendor`, `amount_cents`,
/// `category` and an optional `cost_center`.
pub async fn upload_receipt(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Receipt>>)> {
    let caller = load_caller(&state.pool, &auth).await?;

    let mut form = ReceiptForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let content_type = field.content_type().unwrap_or("").to_string();
            let data = field.bytes().await?;
            form.file = Some((content_type, data.to_vec()));
            continue;
        }

        let slot = match name.as_str() {
            "receipt_date" => &mut form.receipt_date,
            "vendor" => &mut form.vendor,
            "amount_cents" => &mut form.amount_cents,
            "category" => &mut form.category,
            "cost_center" => &mut form.cost_center,
            _ => continue,
        };
        let text = field.text().await?;
        *slot = Some(text);
    }

    let upload = form.validate(state.config.max_upload_bytes)?;
    ensure_month_editable(&state.pool, caller.id(), report_period(upload.receipt_date)).await?;

    let relative = format!(
        "{}/{}.{}",
        caller.id(),
        uuid::Uuid::new_v4(),
        receipt_extension(&upload.content_type)
    );
    let full_path = state.config.upload_dir.join(&relative);
    if let Some(parent) = full_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to create upload dir: {e}")))?;
    }
    tokio::fs::write(&full_path, &upload.data)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to store receipt: {e}")))?;

    let create = CreateReceipt {
        employee_id: caller.id(),
        receipt_date: upload.receipt_date,
        vendor: upload.vendor,
        amount_cents: upload.amount_cents,
        category: upload.category,
        cost_center: upload.cost_center,
        file_path: relative,
        content_type: upload.content_type,
        file_size_bytes: upload.data.len() as i64,
    };
    let receipt = match ReceiptRepo::create(&state.pool, &create).await {
        Ok(r) => r,
        Err(e) => {
            let _ = tokio::fs::remove_file(&full_path).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        receipt_id = receipt.id,
        employee_id = receipt.employee_id,
        amount_cents = receipt.amount_cents,
        bytes = receipt.file_size_bytes,
        "Receipt uploaded"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: receipt })))
}

/// DELETE /api/v1/receipts/{id}
///
/// Deletes the row and then the stored file.
pub async fn delete_receipt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let caller = load_caller(&state.pool, &auth).await?;
    let receipt = ReceiptRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Receipt",
            id,
        }))?;

    ensure_owner_or_admin(&caller, receipt.employee_id)?;
    ensure_month_editable(&state.pool, receipt.employee_id, report_period(receipt.receipt_date))
        .await?;

    if let Some(deleted) = ReceiptRepo::delete(&state.pool, id).await? {
        let path = state.config.upload_dir.join(&deleted.file_path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(receipt_id = id, path = %path.display(), error = %e, "Failed to remove receipt file");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
