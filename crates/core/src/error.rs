//! Domain errors shared by the engine, the repositories' callers and the API.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced employee, report, line item or notification is missing.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: DbId },

    /// Bad input, or an action that does not fit the report's current state.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The request collides with stored state: a locked month, a duplicate
    /// report period, or deleting an approved report.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    /// Authenticated, but not entitled to act on this step or record.
    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
