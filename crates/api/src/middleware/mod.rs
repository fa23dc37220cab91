//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the employee behind a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.

pub mod auth;
pub mod rbac;
