//! Employee entity model and DTOs.

use mileage_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full employee row from the `employees` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`EmployeeResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct Employee {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub position: Option<String>,
    pub supervisor_id: Option<DbId>,
    pub senior_staff_id: Option<DbId>,
    pub cost_centers: Vec<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe employee representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeResponse {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub position: Option<String>,
    pub supervisor_id: Option<DbId>,
    pub senior_staff_id: Option<DbId>,
    pub cost_centers: Vec<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl From<Employee> for EmployeeResponse {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            name: e.name,
            email: e.email,
            role: e.role,
            position: e.position,
            supervisor_id: e.supervisor_id,
            senior_staff_id: e.senior_staff_id,
            cost_centers: e.cost_centers,
            is_active: e.is_active,
            created_at: e.created_at,
        }
    }
}

/// DTO for inserting a new employee. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateEmployee {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub position: Option<String>,
    pub supervisor_id: Option<DbId>,
    pub senior_staff_id: Option<DbId>,
    pub cost_centers: Vec<String>,
}

/// DTO for updating an existing employee. All fields are optional.
///
/// `supervisor_id` and `senior_staff_id` use a nested `Option` so callers
/// can distinguish "leave unchanged" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub position: Option<String>,
    #[serde(default, with = "double_option")]
    pub supervisor_id: Option<Option<DbId>>,
    #[serde(default, with = "double_option")]
    pub senior_staff_id: Option<Option<DbId>>,
    pub cost_centers: Option<Vec<String>>,
    pub is_active: Option<bool>,
    /// New Argon2 hash, written in the same statement as the other fields.
    #[serde(skip)]
    pub password_hash: Option<String>,
}

/// Serde helper: a present-but-null field deserializes to `Some(None)`.
pub mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
