//! Handlers for the `/employees` resource.
//!
//! Reads are open to any authenticated employee (approver pickers and org
//! views need them); writes require the admin role.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mileage_core::cost_centers::validate_cost_centers;
use mileage_core::error::CoreError;
use mileage_core::org::{validate_org_fields, OrgFields};
use mileage_core::roles::{has_supervisor_capability, validate_role, ROLE_ADMIN, ROLE_STAFF};
use mileage_core::types::DbId;
use mileage_db::models::employee::{CreateEmployee, EmployeeResponse, UpdateEmployee};
use mileage_db::repositories::EmployeeRepo;
use mileage_db::DbPool;
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::handlers::access::find_employee;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::{IncludeInactiveParams, PaginationParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /employees`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    #[validate(length(max = 200))]
    pub position: Option<String>,
    pub supervisor_id: Option<DbId>,
    pub senior_staff_id: Option<DbId>,
    #[serde(default)]
    pub cost_centers: Vec<String>,
}

/// Request body for `PUT /employees/{id}`. Absent fields are unchanged;
/// an explicit `null` clears `supervisor_id` / `senior_staff_id`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    #[validate(length(max = 200))]
    pub position: Option<String>,
    #[serde(default, with = "mileage_db::models::employee::double_option")]
    pub supervisor_id: Option<Option<DbId>>,
    #[serde(default, with = "mileage_db::models::employee::double_option")]
    pub senior_staff_id: Option<Option<DbId>>,
    pub cost_centers: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// GET /api/v1/employees
pub async fn list_employees(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<EmployeeResponse>>>> {
    let include_inactive = params.include_inactive && auth.role == ROLE_ADMIN;
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let employees = EmployeeRepo::list(&state.pool, include_inactive, limit, offset).await?;
    Ok(Json(DataResponse {
        data: employees.into_iter().map(EmployeeResponse::from).collect(),
    }))
}

/// GET /api/v1/employees/{id}
pub async fn get_employee(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EmployeeResponse>>> {
    let employee = find_employee(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: employee.into(),
    }))
}

/// POST /api/v1/employees
pub async fn create_employee(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateEmployeeRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<EmployeeResponse>>)> {
    input.validate()?;
    validate_password_strength(&input.password, &input.email)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let role = input.role.unwrap_or_else(|| ROLE_STAFF.to_string());
    validate_role(&role)?;
    validate_cost_centers(&input.cost_centers)?;
    validate_org_fields(&OrgFields {
        employee_id: None,
        role: &role,
        supervisor_id: input.supervisor_id,
        senior_staff_id: input.senior_staff_id,
    })?;
    ensure_active_approver(&state.pool, input.supervisor_id, "supervisor_id").await?;
    ensure_active_approver(&state.pool, input.senior_staff_id, "senior_staff_id").await?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| CoreError::Internal(format!("Password hashing error: {e}")))?;

    let create = CreateEmployee {
        name: input.name.trim().to_string(),
        email: input.email.trim().to_string(),
        password_hash,
        role,
        position: input.position,
        supervisor_id: input.supervisor_id,
        senior_staff_id: input.senior_staff_id,
        cost_centers: input.cost_centers,
    };
    let employee = EmployeeRepo::create(&state.pool, &create).await?;

    tracing::info!(
        admin_id = admin.employee_id,
        employee_id = employee.id,
        role = %employee.role,
        "Employee created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: employee.into(),
        }),
    ))
}

/// PUT /api/v1/employees/{id}
///
/// The org rules are checked against the merged record, so a partial
/// update cannot leave an employee with identical approvers.
pub async fn update_employee(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEmployeeRequest>,
) -> AppResult<Json<DataResponse<EmployeeResponse>>> {
    input.validate()?;
    let existing = find_employee(&state.pool, id).await?;

    if id == admin.employee_id {
        if input.is_active == Some(false) {
            return Err(AppError::Core(CoreError::Validation(
                "You cannot deactivate your own account".into(),
            )));
        }
        if input.role.as_deref().is_some_and(|r| r != existing.role) {
            return Err(AppError::Core(CoreError::Validation(
                "You cannot change your own role".into(),
            )));
        }
    }

    if let Some(role) = &input.role {
        validate_role(role)?;
    }
    if let Some(cost_centers) = &input.cost_centers {
        validate_cost_centers(cost_centers)?;
    }

    let role = input.role.as_deref().unwrap_or(&existing.role);
    let supervisor_id = input.supervisor_id.unwrap_or(existing.supervisor_id);
    let senior_staff_id = input.senior_staff_id.unwrap_or(existing.senior_staff_id);
    validate_org_fields(&OrgFields {
        employee_id: Some(id),
        role,
        supervisor_id,
        senior_staff_id,
    })?;
    if input.supervisor_id.is_some() {
        ensure_active_approver(&state.pool, supervisor_id, "supervisor_id").await?;
    }
    if input.senior_staff_id.is_some() {
        ensure_active_approver(&state.pool, senior_staff_id, "senior_staff_id").await?;
    }

    let password_hash = match &input.password {
        Some(password) => {
            let email = input.email.as_deref().unwrap_or(&existing.email);
            validate_password_strength(password, email)
                .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
            Some(
                hash_password(password)
                    .map_err(|e| CoreError::Internal(format!("Password hashing error: {e}")))?,
            )
        }
        None => None,
    };

    let update = UpdateEmployee {
        name: input.name.map(|n| n.trim().to_string()),
        email: input.email.map(|e| e.trim().to_string()),
        role: input.role,
        position: input.position,
        supervisor_id: input.supervisor_id,
        senior_staff_id: input.senior_staff_id,
        cost_centers: input.cost_centers,
        is_active: input.is_active,
        password_hash,
    };
    let employee = EmployeeRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Employee",
            id,
        }))?;

    tracing::info!(admin_id = admin.employee_id, employee_id = id, "Employee updated");

    Ok(Json(DataResponse {
        data: employee.into(),
    }))
}

/// DELETE /api/v1/employees/{id}
///
/// Deactivates the employee. Rows are kept for reports and history.
pub async fn deactivate_employee(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.employee_id {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot deactivate your own account".into(),
        )));
    }

    if !EmployeeRepo::deactivate(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Employee",
            id,
        }));
    }

    tracing::info!(admin_id = admin.employee_id, employee_id = id, "Employee deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// A referenced approver must exist and be active. Supervisors must also
/// hold supervisor capability, by role or by position title.
async fn ensure_active_approver(
    pool: &DbPool,
    approver_id: Option<DbId>,
    field: &str,
) -> AppResult<()> {
    let Some(approver_id) = approver_id else {
        return Ok(());
    };
    match EmployeeRepo::find_by_id(pool, approver_id).await? {
        Some(e)
            if field == "supervisor_id"
                && !has_supervisor_capability(&e.role, e.position.as_deref()) =>
        {
            Err(AppError::Core(CoreError::Validation(format!(
                "Employee {approver_id} cannot supervise: role '{}' has no supervisor capability",
                e.role
            ))))
        }
        Some(e) if e.is_active => Ok(()),
        Some(_) => Err(AppError::Core(CoreError::Validation(format!(
            "{field} refers to a deactivated employee"
        )))),
        None => Err(AppError::Core(CoreError::Validation(format!(
            "{field} refers to an unknown employee"
        )))),
    }
}
