use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::mileage;
use crate::state::AppState;

/// Routes mounted at `/mileage-entries`.
///
/// ```text
/// GET    /          -> list_mileage (?year&month&employee_id)
/// POST   /          -> create_mileage
/// DELETE /{id}      -> delete_mileage
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(mileage::list_mileage).post(mileage::create_mileage))
        .route("/{id}", delete(mileage::delete_mileage))
}
