//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::Json;
use mileage_core::error::CoreError;
use mileage_db::models::employee::EmployeeResponse;
use mileage_db::repositories::EmployeeRepo;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::handlers::access::load_caller;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub employee: EmployeeResponse,
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password and return an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        ))
    };

    let employee = EmployeeRepo::find_by_email(&state.pool, input.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !employee.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &employee.password_hash)
        .map_err(|e| CoreError::Internal(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(employee_id = employee.id, "Failed login attempt");
        return Err(invalid());
    }

    let access_token = generate_access_token(employee.id, &employee.role, &state.config.jwt)
        .map_err(|e| CoreError::Internal(format!("Token generation error: {e}")))?;

    tracing::info!(employee_id = employee.id, role = %employee.role, "Employee logged in");

    Ok(Json(DataResponse {
        data: AuthResponse {
            access_token,
            expires_in: state.config.jwt.access_token_expiry_mins * 60,
            employee: employee.into(),
        },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<EmployeeResponse>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    Ok(Json(DataResponse {
        data: caller.employee.into(),
    }))
}
