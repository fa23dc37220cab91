//! Shared lookups and visibility rules used across handlers.

use chrono::{Datelike, Utc};
use mileage_core::entries::{ensure_period_editable, validate_period};
use mileage_core::error::CoreError;
use mileage_core::roles::{has_finance_capability, ROLE_ADMIN};
use mileage_core::types::DbId;
use mileage_core::workflow::{Actor, Stage};
use mileage_db::models::employee::Employee;
use mileage_db::repositories::{EmployeeRepo, ExpenseReportRepo};
use mileage_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// The authenticated employee, reloaded from the database, with the
/// capabilities the workflow engine needs.
#[derive(Debug, Clone)]
pub struct Caller {
    pub employee: Employee,
    pub actor: Actor,
}

impl Caller {
    pub fn id(&self) -> DbId {
        self.employee.id
    }

    pub fn is_admin(&self) -> bool {
        self.actor.is_admin
    }

    pub fn is_finance(&self) -> bool {
        self.actor.is_finance
    }

    /// Admins and finance see every employee's expense data; approvers see
    /// the data of the employees reporting to them.
    pub fn can_view_employee(&self, target: &Employee) -> bool {
        self.is_admin()
            || self.is_finance()
            || target.id == self.id()
            || target.supervisor_id == Some(self.id())
            || target.senior_staff_id == Some(self.id())
    }
}

/// Reload the caller. A token for a deactivated employee is rejected.
pub async fn load_caller(pool: &DbPool, auth: &AuthUser) -> AppResult<Caller> {
    let employee = EmployeeRepo::find_by_id(pool, auth.employee_id)
        .await?
        .filter(|e| e.is_active)
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Account is missing or deactivated".into(),
            ))
        })?;

    let actor = Actor {
        id: employee.id,
        is_admin: employee.role == ROLE_ADMIN,
        is_finance: has_finance_capability(&employee.role, employee.position.as_deref()),
    };
    Ok(Caller { employee, actor })
}

/// Find an employee by id or fail with 404.
pub async fn find_employee(pool: &DbPool, id: DbId) -> AppResult<Employee> {
    EmployeeRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Employee",
            id,
        }))
}

/// Resolve whose line items a request targets. Defaults to the caller.
pub async fn resolve_subject(
    pool: &DbPool,
    caller: &Caller,
    employee_id: Option<DbId>,
) -> AppResult<Employee> {
    match employee_id {
        None => Ok(caller.employee.clone()),
        Some(id) if id == caller.id() => Ok(caller.employee.clone()),
        Some(id) => {
            let target = find_employee(pool, id).await?;
            if !caller.can_view_employee(&target) {
                return Err(AppError::Core(CoreError::Forbidden(
                    "You may not view this employee's expenses".into(),
                )));
            }
            Ok(target)
        }
    }
}

/// The requested period, defaulting to the current month.
pub fn resolve_period(year: Option<i32>, month: Option<i32>) -> AppResult<(i32, i32)> {
    let today = Utc::now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month() as i32);
    validate_period(year, month)?;
    Ok((year, month))
}

/// Fail with 409 if the employee's report for the month is with approvers
/// or already approved.
pub async fn ensure_month_editable(
    pool: &DbPool,
    employee_id: DbId,
    (year, month): (i32, i32),
) -> AppResult<()> {
    let stage = match ExpenseReportRepo::find_for_period(pool, employee_id, year, month).await? {
        Some(report) => Some(
            report
                .current_stage
                .parse::<Stage>()
                .map_err(|e| CoreError::Internal(e.to_string()))?,
        ),
        None => None,
    };
    ensure_period_editable(stage)?;
    Ok(())
}

/// Only the owner of a line item, or an admin, may delete it.
pub fn ensure_owner_or_admin(caller: &Caller, owner_id: DbId) -> AppResult<()> {
    if caller.id() == owner_id || caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Only the owner can modify this entry".into(),
        )))
    }
}
