//! Handlers for the `/expense-reports` resource: submission, the approver
//! queue, workflow actions and history.
//!
//! Every state change is computed by `mileage_core::workflow`, persisted in
//! one transaction, and only then published on the event bus.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use mileage_core::cost_centers::validate_cost_center;
use mileage_core::entries::validate_period;
use mileage_core::error::CoreError;
use mileage_core::escalation::is_overdue;
use mileage_core::mileage::reimbursement_cents;
use mileage_core::types::DbId;
use mileage_core::workflow::{
    self, ActionRequest, OrgChain, ReportStatus, Transition, WorkflowAction,
};
use mileage_db::models::employee::Employee;
use mileage_db::models::expense_report::{
    CreateExpenseReport, ExpenseReport, NewReportAction, OverdueReport, ReportAction,
    ReportDetail, ReportFilter,
};
use mileage_db::repositories::{
    EmployeeRepo, ExpenseReportRepo, MileageEntryRepo, ReceiptRepo, TimeEntryRepo,
};
use mileage_db::DbPool;
use mileage_events::WorkflowEvent;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{find_employee, load_caller, Caller};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /expense-reports`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReportRequest {
    pub year: i32,
    pub month: i32,
    pub cost_center: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Submit on behalf of another employee. Admin only.
    pub employee_id: Option<DbId>,
}

/// Request body for `POST /expense-reports/{id}/action`.
#[derive(Debug, Deserialize, Validate)]
pub struct ActionRequestBody {
    pub action: String,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    pub delegate_to: Option<DbId>,
}

/// Request body for `POST /expense-reports/{id}/resubmit`.
#[derive(Debug, Deserialize, Validate)]
pub struct ResubmitRequest {
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// Query parameters for `GET /expense-reports`.
#[derive(Debug, Deserialize)]
pub struct ReportListParams {
    pub status: Option<String>,
    pub employee_id: Option<DbId>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Line-item totals for the month a report covers.
#[derive(Debug, Serialize)]
pub struct ReportTotals {
    pub miles: f64,
    pub mileage_cents: i64,
    pub mileage_rate_cents: i64,
    pub receipt_cents: i64,
    pub hours: f64,
}

/// Report detail with the owner's line-item totals.
#[derive(Debug, Serialize)]
pub struct ReportDetailResponse {
    #[serde(flatten)]
    pub detail: ReportDetail,
    /// Whether the pending step is past its escalation deadline.
    pub overdue: bool,
    pub totals: ReportTotals,
}

// ---------------------------------------------------------------------------
// Submission and queries
// ---------------------------------------------------------------------------

/// POST /api/v1/expense-reports
///
/// Submit the report for a month. The approval chain is taken from the
/// owner's current supervisor and senior staff.
pub async fn submit_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitReportRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ReportDetail>>)> {
    input.validate()?;
    let caller = load_caller(&state.pool, &auth).await?;

    let owner = match input.employee_id {
        Some(id) if id != caller.id() => {
            if !caller.is_admin() {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Only admins can submit reports for other employees".into(),
                )));
            }
            find_employee(&state.pool, id).await?
        }
        _ => caller.employee.clone(),
    };
    if !owner.is_active {
        return Err(AppError::Core(CoreError::Validation(
            "Deactivated employees cannot submit reports".into(),
        )));
    }

    validate_period(input.year, input.month)?;
    if let Some(cc) = &input.cost_center {
        validate_cost_center(cc)?;
    }

    if ExpenseReportRepo::find_for_period(&state.pool, owner.id, input.year, input.month)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "A report for {}-{:02} already exists",
            input.year, input.month
        ))));
    }

    ensure_active_approver(&state.pool, owner.supervisor_id, "supervisor").await?;
    ensure_active_approver(&state.pool, owner.senior_staff_id, "senior staff").await?;

    let chain = OrgChain {
        senior_staff_id: owner.senior_staff_id,
        supervisor_id: owner.supervisor_id,
    };
    let transition = workflow::submit(&chain, Utc::now())?;
    transition.workflow.check_invariants().map_err(CoreError::Internal)?;

    let create = CreateExpenseReport {
        employee_id: owner.id,
        year: input.year,
        month: input.month,
        cost_center: input.cost_center,
        notes: input.notes,
    };
    let detail =
        ExpenseReportRepo::create(&state.pool, &create, &transition.workflow, caller.id()).await?;

    tracing::info!(
        report_id = detail.report.id,
        actor_id = caller.id(),
        action = "submit",
        status = %detail.report.status,
        "Expense report submitted"
    );
    publish(&state, &detail.report, &owner, &transition, caller.id(), None);

    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/expense-reports
///
/// Admins and finance see every report; everyone else sees their own
/// reports and the reports routed through them.
pub async fn list_reports(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ReportListParams>,
) -> AppResult<Json<DataResponse<Vec<ExpenseReport>>>> {
    let caller = load_caller(&state.pool, &auth).await?;

    if let Some(status) = &params.status {
        status.parse::<ReportStatus>()?;
    }
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let filter = ReportFilter {
        status: params.status,
        employee_id: params.employee_id,
        year: params.year,
        month: params.month,
        visible_to: (!caller.is_admin() && !caller.is_finance()).then(|| caller.id()),
    };
    let reports = ExpenseReportRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse { data: reports }))
}

/// GET /api/v1/expense-reports/pending
///
/// The caller's approval queue, most urgent first.
pub async fn list_pending(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ExpenseReport>>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    let reports = ExpenseReportRepo::list_pending_for(
        &state.pool,
        caller.id(),
        caller.is_admin(),
        caller.is_finance(),
    )
    .await?;
    Ok(Json(DataResponse { data: reports }))
}

/// GET /api/v1/expense-reports/overdue
///
/// Reports whose pending step is past its escalation deadline. Admins and
/// finance see all of them; other approvers see the steps assigned to them.
pub async fn list_overdue(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<OverdueReport>>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    let mut overdue = ExpenseReportRepo::list_overdue(&state.pool, Utc::now()).await?;
    if !caller.is_admin() && !caller.is_finance() {
        overdue.retain(|r| r.approver_id == Some(caller.id()));
    }
    Ok(Json(DataResponse { data: overdue }))
}

/// GET /api/v1/expense-reports/{id}
pub async fn get_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReportDetailResponse>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    let detail = find_visible_detail(&state.pool, &caller, id).await?;

    let r = &detail.report;
    let miles = MileageEntryRepo::total_miles(&state.pool, r.employee_id, r.year, r.month).await?;
    let receipt_cents: i64 = ReceiptRepo::list_for_period(&state.pool, r.employee_id, r.year, r.month)
        .await?
        .iter()
        .map(|rc| rc.amount_cents)
        .sum();
    let hours: f64 = TimeEntryRepo::list_for_period(&state.pool, r.employee_id, r.year, r.month)
        .await?
        .iter()
        .map(|t| t.hours)
        .sum();
    let rate = state.config.mileage_rate_cents;
    let now = Utc::now();
    let overdue = detail
        .steps
        .iter()
        .filter_map(|row| row.to_step().ok())
        .any(|step| is_overdue(&step, now));

    Ok(Json(DataResponse {
        data: ReportDetailResponse {
            overdue,
            totals: ReportTotals {
                miles,
                mileage_cents: reimbursement_cents(miles, rate),
                mileage_rate_cents: rate,
                receipt_cents,
                hours,
            },
            detail,
        },
    }))
}

/// GET /api/v1/expense-reports/{id}/history
pub async fn get_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ReportAction>>>> {
    let caller = load_caller(&state.pool, &auth).await?;
    find_visible_detail(&state.pool, &caller, id).await?;
    let actions = ExpenseReportRepo::list_actions(&state.pool, id).await?;
    Ok(Json(DataResponse { data: actions }))
}

/// DELETE /api/v1/expense-reports/{id}
///
/// The owner or an admin may withdraw a report until it is approved.
pub async fn delete_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let caller = load_caller(&state.pool, &auth).await?;
    let report = find_report(&state.pool, id).await?;

    if report.employee_id != caller.id() && !caller.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the report owner or an admin can delete a report".into(),
        )));
    }
    if report.status == ReportStatus::Approved.as_str() {
        return Err(AppError::Core(CoreError::Conflict(
            "Approved reports cannot be deleted".into(),
        )));
    }

    if !ExpenseReportRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ExpenseReport",
            id,
        }));
    }

    tracing::info!(report_id = id, actor_id = caller.id(), "Expense report deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Workflow actions
// ---------------------------------------------------------------------------

/// POST /api/v1/expense-reports/{id}/action
pub async fn perform_action(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ActionRequestBody>,
) -> AppResult<Json<DataResponse<ReportDetail>>> {
    input.validate()?;
    let caller = load_caller(&state.pool, &auth).await?;
    let action: WorkflowAction = input.action.parse()?;

    let detail = ExpenseReportRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ExpenseReport",
            id,
        }))?;
    let current = detail.report.to_workflow(&detail.steps)?;

    if action == WorkflowAction::Delegate {
        if let Some(target) = input.delegate_to {
            ensure_active_approver(&state.pool, Some(target), "delegate_to").await?;
        }
    }

    let request = ActionRequest {
        action,
        actor: caller.actor,
        owner_id: detail.report.employee_id,
        comment: input.comment.as_deref(),
        delegate_to: input.delegate_to,
        now: Utc::now(),
    };
    let transition = workflow::apply_action(&current, &request)?;
    transition.workflow.check_invariants().map_err(CoreError::Internal)?;

    let entry = NewReportAction {
        actor_id: caller.id(),
        action: action.as_str().to_string(),
        comment: input.comment.clone().filter(|c| !c.trim().is_empty()),
        from_status: Some(detail.report.status.clone()),
        to_status: transition.workflow.status.as_str().to_string(),
    };

    let updated = if action.is_informational() {
        ExpenseReportRepo::log_action(&state.pool, id, &entry).await?;
        detail
    } else {
        ExpenseReportRepo::save_transition(&state.pool, id, &transition.workflow, &entry, false)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "ExpenseReport",
                id,
            }))?
    };

    tracing::info!(
        report_id = id,
        actor_id = caller.id(),
        action = %action,
        status = %updated.report.status,
        stage = %updated.report.current_stage,
        "Workflow action applied"
    );

    let owner = find_employee(&state.pool, updated.report.employee_id).await?;
    publish(
        &state,
        &updated.report,
        &owner,
        &transition,
        caller.id(),
        input.comment,
    );

    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/expense-reports/{id}/resubmit
///
/// The owner resubmits a report that was returned to them. The workflow
/// restarts at its first step.
pub async fn resubmit_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResubmitRequest>,
) -> AppResult<Json<DataResponse<ReportDetail>>> {
    input.validate()?;
    let caller = load_caller(&state.pool, &auth).await?;

    let detail = ExpenseReportRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ExpenseReport",
            id,
        }))?;
    let current = detail.report.to_workflow(&detail.steps)?;
    let owner_id = detail.report.employee_id;

    let transition = workflow::resubmit(&current, &caller.actor, owner_id, Utc::now())?;
    transition.workflow.check_invariants().map_err(CoreError::Internal)?;

    let entry = NewReportAction {
        actor_id: caller.id(),
        action: "resubmit".to_string(),
        comment: input.comment.clone().filter(|c| !c.trim().is_empty()),
        from_status: Some(detail.report.status.clone()),
        to_status: transition.workflow.status.as_str().to_string(),
    };
    let updated =
        ExpenseReportRepo::save_transition(&state.pool, id, &transition.workflow, &entry, true)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "ExpenseReport",
                id,
            }))?;

    tracing::info!(
        report_id = id,
        actor_id = caller.id(),
        action = "resubmit",
        status = %updated.report.status,
        "Expense report resubmitted"
    );

    let owner = find_employee(&state.pool, owner_id).await?;
    publish(
        &state,
        &updated.report,
        &owner,
        &transition,
        caller.id(),
        input.comment,
    );

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_report(pool: &DbPool, id: DbId) -> AppResult<ExpenseReport> {
    ExpenseReportRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ExpenseReport",
            id,
        }))
}

/// Load a report the caller may see. Reports the caller may not see are
/// reported as missing.
async fn find_visible_detail(pool: &DbPool, caller: &Caller, id: DbId) -> AppResult<ReportDetail> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "ExpenseReport",
            id,
        })
    };
    let detail = ExpenseReportRepo::find_detail(pool, id)
        .await?
        .ok_or_else(not_found)?;

    let visible = caller.is_admin()
        || caller.is_finance()
        || detail.report.employee_id == caller.id()
        || detail
            .steps
            .iter()
            .any(|s| s.approver_id == Some(caller.id()));
    if !visible {
        return Err(not_found());
    }
    Ok(detail)
}

/// Approvers referenced by a report must be active employees.
async fn ensure_active_approver(
    pool: &DbPool,
    approver_id: Option<DbId>,
    label: &str,
) -> AppResult<()> {
    let Some(approver_id) = approver_id else {
        return Ok(());
    };
    let approver: Option<Employee> = EmployeeRepo::find_by_id(pool, approver_id).await?;
    match approver {
        Some(e) if e.is_active => Ok(()),
        _ => Err(AppError::Core(CoreError::Validation(format!(
            "The {label} (employee {approver_id}) is missing or deactivated"
        )))),
    }
}

/// Publish the event for a committed transition.
fn publish(
    state: &AppState,
    report: &ExpenseReport,
    owner: &Employee,
    transition: &Transition,
    actor_id: DbId,
    comment: Option<String>,
) {
    let event = WorkflowEvent::new(
        transition.event,
        report.id,
        owner.id,
        owner.name.clone(),
        (report.year, report.month),
        actor_id,
    )
    .with_comment(comment)
    .with_notify(transition.notify);
    state.event_bus.publish(event);
}
