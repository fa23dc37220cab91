use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::time_entries;
use crate::state::AppState;

/// Routes mounted at `/time-entries`.
///
/// ```text
/// GET    /          -> list_time_entries (?year&month&employee_id)
/// POST   /          -> create_time_entry
/// DELETE /{id}      -> delete_time_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(time_entries::list_time_entries).post(time_entries::create_time_entry),
        )
        .route("/{id}", delete(time_entries::delete_time_entry))
}
