//! Route definitions for the `/expense-reports` resource.
//!
//! All endpoints require authentication. Per-report authorization is
//! decided by the workflow engine.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::expense_reports;
use crate::state::AppState;

/// Routes mounted at `/expense-reports`.
///
/// ```text
/// GET    /                 -> list_reports
/// POST   /                 -> submit_report
/// GET    /pending          -> list_pending
/// GET    /overdue          -> list_overdue
/// GET    /{id}             -> get_report
/// DELETE /{id}             -> delete_report
/// POST   /{id}/action      -> perform_action
/// POST   /{id}/resubmit    -> resubmit_report
/// GET    /{id}/history     -> get_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(expense_reports::list_reports).post(expense_reports::submit_report),
        )
        .route("/pending", get(expense_reports::list_pending))
        .route("/overdue", get(expense_reports::list_overdue))
        .route(
            "/{id}",
            get(expense_reports::get_report).delete(expense_reports::delete_report),
        )
        .route("/{id}/action", post(expense_reports::perform_action))
        .route("/{id}/resubmit", post(expense_reports::resubmit_report))
        .route("/{id}/history", get(expense_reports::get_history))
}
