use axum::routing::get;
use axum::Router;

use crate::handlers::cost_centers;
use crate::state::AppState;

/// Routes mounted at `/cost-centers`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(cost_centers::list_cost_centers))
}
