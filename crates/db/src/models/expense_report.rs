//! Expense report, workflow step and action-log models.

use mileage_core::error::CoreError;
use mileage_core::types::{DbId, Timestamp};
use mileage_core::workflow::{ReportWorkflow, WorkflowStep};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `expense_reports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpenseReport {
    pub id: DbId,
    pub employee_id: DbId,
    pub year: i32,
    pub month: i32,
    pub cost_center: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub current_stage: String,
    pub current_approval_step: i32,
    pub submitted_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ExpenseReport {
    /// Rebuild the engine view of this report from its stored steps.
    ///
    /// Fails with [`CoreError::Internal`] if the stored values are not
    /// recognised, which only happens if the row was edited by hand.
    pub fn to_workflow(&self, steps: &[WorkflowStepRow]) -> Result<ReportWorkflow, CoreError> {
        let steps = steps
            .iter()
            .map(WorkflowStepRow::to_step)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReportWorkflow {
            status: self.status.parse().map_err(corrupt)?,
            stage: self.current_stage.parse().map_err(corrupt)?,
            current_step: usize::try_from(self.current_approval_step).unwrap_or(0),
            steps,
        })
    }
}

/// A row from the `workflow_steps` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowStepRow {
    pub id: DbId,
    pub report_id: DbId,
    pub position: i32,
    pub role: String,
    pub state: String,
    pub approver_id: Option<DbId>,
    pub escalation_due_at: Option<Timestamp>,
    pub acted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkflowStepRow {
    pub fn to_step(&self) -> Result<WorkflowStep, CoreError> {
        Ok(WorkflowStep {
            role: self.role.parse().map_err(corrupt)?,
            state: self.state.parse().map_err(corrupt)?,
            approver_id: self.approver_id,
            escalation_due_at: self.escalation_due_at,
            acted_at: self.acted_at,
        })
    }
}

fn corrupt(e: CoreError) -> CoreError {
    CoreError::Internal(format!("Stored workflow state is invalid: {e}"))
}

/// DTO for a new report. Status and steps come from the workflow engine.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExpenseReport {
    pub employee_id: DbId,
    pub year: i32,
    pub month: i32,
    pub cost_center: Option<String>,
    pub notes: Option<String>,
}

/// An entry in the `report_actions` audit log.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReportAction {
    pub id: DbId,
    pub report_id: DbId,
    pub actor_id: Option<DbId>,
    pub action: String,
    pub comment: Option<String>,
    pub from_status: Option<String>,
    pub to_status: String,
    pub created_at: Timestamp,
}

/// Insert DTO for [`ReportAction`].
#[derive(Debug, Clone)]
pub struct NewReportAction {
    pub actor_id: DbId,
    pub action: String,
    pub comment: Option<String>,
    pub from_status: Option<String>,
    pub to_status: String,
}

/// A report whose pending step is past its escalation deadline.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OverdueReport {
    pub report_id: DbId,
    pub employee_id: DbId,
    pub employee_name: String,
    pub year: i32,
    pub month: i32,
    pub status: String,
    pub step_role: String,
    pub approver_id: Option<DbId>,
    pub escalation_due_at: Timestamp,
}

/// Optional filters for listing reports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<String>,
    pub employee_id: Option<DbId>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    /// Restrict to reports owned by, or routed through, this employee.
    #[serde(skip)]
    pub visible_to: Option<DbId>,
}

/// Report with its steps, as returned by detail endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: ExpenseReport,
    pub steps: Vec<WorkflowStepRow>,
}
