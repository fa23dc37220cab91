//! Handlers for the `/time-entries` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use mileage_core::cost_centers::validate_cost_center;
use mileage_core::entries::{report_period, validate_hours};
use mileage_core::error::CoreError;
use mileage_core::types::DbId;
use mileage_db::models::time_entry::{CreateTimeEntry, TimeEntry};
use mileage_db::repositories::TimeEntryRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{
    ensure_month_editable, ensure_owner_or_admin, load_caller, resolve_period, resolve_subject,
};
use crate::middleware::auth::AuthUser;
use crate::query::PeriodParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /time-entries`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTimeEntryRequest {
    pub work_date: NaiveDate,
    pub hours: f64,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub cost_center: Option<String>,
}

/// GET /api/v1/time-entries
pub async fn list_time_entries(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<DataResponse<Vec<TimeEntry>>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    let subject = resolve_subject(&state.pool, &caller, params.employee_id).await?;
    let (year, month) = resolve_period(params.year, params.month)?;

    let entries = TimeEntryRepo::list_for_period(&state.pool, subject.id, year, month).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/time-entries
pub async fn create_time_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTimeEntryRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TimeEntry>>)> {
    input.validate()?;
    let caller = load_caller(&state.pool, &auth).await?;

    validate_hours(input.hours)?;
    if let Some(cc) = &input.cost_center {
        validate_cost_center(cc)?;
    }
    ensure_month_editable(&state.pool, caller.id(), report_period(input.work_date)).await?;

    let create = CreateTimeEntry {
        employee_id: caller.id(),
        work_date: input.work_date,
        hours: input.hours,
        description: input.description,
        cost_center: input.cost_center,
    };
    let entry = TimeEntryRepo::create(&state.pool, &create).await?;

    tracing::info!(
        entry_id = entry.id,
        employee_id = entry.employee_id,
        hours = entry.hours,
        "Time entry recorded"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/time-entries/{id}
pub async fn delete_time_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let caller = load_caller(&state.pool, &auth).await?;
    let entry = TimeEntryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TimeEntry",
            id,
        }))?;

    ensure_owner_or_admin(&caller, entry.employee_id)?;
    ensure_month_editable(&state.pool, entry.employee_id, report_period(entry.work_date)).await?;

    TimeEntryRepo::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
