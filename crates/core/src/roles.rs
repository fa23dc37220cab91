//! Well-known employee role constants and position classification.
//!
//! Role names must match the `ck_employees_role` CHECK constraint in
//! `20260301000001_create_employees.sql`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

pub const ROLE_STAFF: &str = "staff";
pub const ROLE_SENIOR_STAFF: &str = "senior_staff";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_FINANCE: &str = "finance";
pub const ROLE_ADMIN: &str = "admin";

/// All valid role values.
pub const VALID_ROLES: &[&str] = &[
    ROLE_STAFF,
    ROLE_SENIOR_STAFF,
    ROLE_SUPERVISOR,
    ROLE_FINANCE,
    ROLE_ADMIN,
];

/// The only role allowed to have no supervisor.
pub const TOP_LEVEL_ROLE: &str = ROLE_ADMIN;

static SUPERVISOR_POSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(supervisor|manager)\b").expect("valid regex"));

static FINANCE_POSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfinance\b").expect("valid regex"));

/// Validate that a role string is one of the accepted values.
pub fn validate_role(role: &str) -> Result<(), CoreError> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        )))
    }
}

/// Capabilities implied by a free-text position title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionCapabilities {
    pub is_supervisor: bool,
    pub is_finance: bool,
}

/// Classify a position title ("Field Supervisor", "Finance Manager", ...).
pub fn classify_position(position: &str) -> PositionCapabilities {
    PositionCapabilities {
        is_supervisor: SUPERVISOR_POSITION_RE.is_match(position),
        is_finance: FINANCE_POSITION_RE.is_match(position),
    }
}

/// Whether an employee may act on finance approval steps.
pub fn has_finance_capability(role: &str, position: Option<&str>) -> bool {
    role == ROLE_FINANCE || position.is_some_and(|p| classify_position(p).is_finance)
}

/// Whether an employee may be assigned as someone's supervisor.
pub fn has_supervisor_capability(role: &str, position: Option<&str>) -> bool {
    matches!(role, ROLE_SUPERVISOR | ROLE_ADMIN)
        || position.is_some_and(|p| classify_position(p).is_supervisor)
}
