use axum::Json;
use mileage_core::cost_centers::{CostCenter, COST_CENTERS};

use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;

/// GET /api/v1/cost-centers
pub async fn list_cost_centers(_auth: AuthUser) -> Json<DataResponse<&'static [CostCenter]>> {
    Json(DataResponse { data: COST_CENTERS })
}
