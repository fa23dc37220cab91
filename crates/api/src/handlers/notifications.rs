//! Handlers for the `/notifications` resource.
//!
//! Employees only ever see their own notifications.

use axum::extract::{Path, Query, State};
use axum::Json;
use mileage_core::error::CoreError;
use mileage_core::types::DbId;
use mileage_db::models::notification::Notification;
use mileage_db::repositories::NotificationRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A page of notifications plus the caller's unread count.
#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<NotificationList>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let notifications = NotificationRepo::list_for_recipient(
        &state.pool,
        auth.employee_id,
        params.unread_only,
        limit,
        offset,
    )
    .await?;
    let unread_count = NotificationRepo::count_unread(&state.pool, auth.employee_id).await?;

    Ok(Json(DataResponse {
        data: NotificationList {
            notifications,
            unread_count,
        },
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Returns 404 if the notification does not belong to the caller.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let notification = NotificationRepo::mark_read(&state.pool, id, auth.employee_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id,
        }))?;
    Ok(Json(DataResponse { data: notification }))
}
