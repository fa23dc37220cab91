use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::receipts;
use crate::state::AppState;

/// Headroom for the multipart framing and text fields around the file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/receipts`.
///
/// ```text
/// GET    /          -> list_receipts (?year&month&employee_id)
/// POST   /          -> upload_receipt (multipart)
/// DELETE /{id}      -> delete_receipt
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(receipts::list_receipts).post(receipts::upload_receipt),
        )
        .route("/{id}", delete(receipts::delete_receipt))
        .layer(DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD_BYTES))
}
