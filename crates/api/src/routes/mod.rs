pub mod auth;
pub mod cost_centers;
pub mod employees;
pub mod expense_reports;
pub mod health;
pub mod mileage;
pub mod notifications;
pub mod receipts;
pub mod time_entries;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/me                                         current employee
///
/// /cost-centers                                    list
///
/// /employees                                       list, create (admin)
/// /employees/{id}                                  get, update, deactivate (admin)
///
/// /expense-reports                                 list, submit
/// /expense-reports/pending                         approver queue
/// /expense-reports/overdue                         past escalation deadline
/// /expense-reports/{id}                            get, delete
/// /expense-reports/{id}/action                     workflow action (POST)
/// /expense-reports/{id}/resubmit                   resubmit after revision (POST)
/// /expense-reports/{id}/history                    action log
///
/// /mileage-entries                                 list, create
/// /mileage-entries/{id}                            delete
/// /receipts                                        list, upload (multipart)
/// /receipts/{id}                                   delete
/// /time-entries                                    list, create
/// /time-entries/{id}                               delete
///
/// /notifications                                   list
/// /notifications/{id}/read                         mark read (POST)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/cost-centers", cost_centers::router())
        .nest("/employees", employees::router())
        .nest("/expense-reports", expense_reports::router())
        .nest("/mileage-entries", mileage::router())
        .nest("/receipts", receipts::router(config.max_upload_bytes))
        .nest("/time-entries", time_entries::router())
        .nest("/notifications", notifications::router())
}
