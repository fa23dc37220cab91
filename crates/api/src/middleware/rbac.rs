//! Role gates for administrative endpoints.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use mileage_core::error::CoreError;
use mileage_core::roles::ROLE_ADMIN;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Employee-directory writes are limited to administrators. The role comes
/// from the token; approver actions check entitlement per step instead.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role == ROLE_ADMIN {
            Ok(RequireAdmin(user))
        } else {
            Err(AppError::Core(CoreError::Forbidden(format!(
                "Only administrators may do this (your role: {})",
                user.role
            ))))
        }
    }
}
