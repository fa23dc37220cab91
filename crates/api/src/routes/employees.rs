//! Route definitions for the `/employees` resource.
//!
//! Reads require authentication; writes require the admin role.

use axum::routing::get;
use axum::Router;

use crate::handlers::employees;
use crate::state::AppState;

/// Routes mounted at `/employees`.
///
/// ```text
/// GET    /          -> list_employees
/// POST   /          -> create_employee (admin)
/// GET    /{id}      -> get_employee
/// PUT    /{id}      -> update_employee (admin)
/// DELETE /{id}      -> deactivate_employee (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route(
            "/{id}",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::deactivate_employee),
        )
}
