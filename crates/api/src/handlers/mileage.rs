//! Handlers for the `/mileage-entries` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use mileage_core::cost_centers::validate_cost_center;
use mileage_core::entries::report_period;
use mileage_core::error::CoreError;
use mileage_core::mileage::{round_tenth, track_distance_miles, validate_miles, GpsPoint};
use mileage_core::types::DbId;
use mileage_db::models::mileage::{CreateMileageEntry, MileageEntry};
use mileage_db::repositories::MileageEntryRepo;
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

/// Request body for `POST /mileage-entries`.
///
/// Exactly one of `miles` and `gps_points` must be given.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMileageRequest {
    pub trip_date: NaiveDate,
    #[validate(length(max = 500))]
    pub start_location: Option<String>,
    #[validate(length(max = 500))]
    pub end_location: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub purpose: String,
    pub miles: Option<f64>,
    pub gps_points: Option<Vec<GpsPoint>>,
    pub cost_center: Option<String>,
}

/// Resolve the distance of a new entry from either input.
fn resolve_miles(miles: Option<f64>, gps_points: Option<&[GpsPoint]>) -> Result<(f64, i32), CoreError> {
    match (miles, gps_points) {
        (Some(_), Some(_)) => Err(CoreError::Validation(
            "Provide either miles or gps_points, not both".into(),
        )),
        (None, None) => Err(CoreError::Validation(
            "Either miles or gps_points is required".into(),
        )),
        (Some(miles), None) => {
            validate_miles(miles)?;
            Ok((round_tenth(miles), 0))
        }
        (None, Some(points)) => {
            if points.len() < 2 {
                return Err(CoreError::Validation(
                    "A GPS track needs at least two points".into(),
                ));
            }
            let miles = track_distance_miles(points)?;
            validate_miles(miles)?;
            let count = i32::try_from(points.len())
                .map_err(|_| CoreError::Validation("GPS track is too long".into()))?;
            Ok((miles, count))
        }
    }
}

/// GET /api/v1/mileage-entries
pub async fn list_mileage(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PeriodParams>,
) -> AppResult<Json<DataResponse<Vec<MileageEntry>>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    let subject = resolve_subject(&state.pool, &caller, params.employee_id).await?;
    let (year, month) = resolve_period(params.year, params.month)?;

    let entries = MileageEntryRepo::list_for_period(&state.pool, subject.id, year, month).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/mileage-entries
pub async fn create_mileage(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateMileageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<MileageEntry>>)> {
    input.validate()?;
    let caller = load_caller(&state.pool, &auth).await?;

    if let Some(cc) = &input.cost_center {
        validate_cost_center(cc)?;
    }
    let (miles, gps_point_count) = resolve_miles(input.miles, input.gps_points.as_deref())?;
    ensure_month_editable(&state.pool, caller.id(), report_period(input.trip_date)).await?;

    let create = CreateMileageEntry {
        employee_id: caller.id(),
        trip_date: input.trip_date,
        start_location: input.start_location,
        end_location: input.end_location,
        purpose: input.purpose.trim().to_string(),
        miles,
        gps_point_count,
        cost_center: input.cost_center,
    };
    let entry = MileageEntryRepo::create(&state.pool, &create).await?;

    tracing::info!(
        entry_id = entry.id,
        employee_id = entry.employee_id,
        miles = entry.miles,
        gps_points = entry.gps_point_count,
        "Mileage entry recorded"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/mileage-entries/{id}
pub async fn delete_mileage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let caller = load_caller(&state.pool, &auth).await?;
    let entry = MileageEntryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MileageEntry",
            id,
        }))?;

    ensure_owner_or_admin(&caller, entry.employee_id)?;
    ensure_month_editable(&state.pool, entry.employee_id, report_period(entry.trip_date)).await?;

    MileageEntryRepo::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
