//! Repository for `expense_reports`, `workflow_steps` and `report_actions`.
//!
//! A report and its steps are always written together in one transaction,
//! together with the action-log entry describing the change.

use sqlx::{PgPool, Postgres, Transaction};
use mileage_core::types::{DbId, Timestamp};
use mileage_core::workflow::{ReportStatus, ReportWorkflow};

use crate::models::expense_report::{
    CreateExpenseReport, ExpenseReport, NewReportAction, OverdueReport, ReportAction,
    ReportDetail, ReportFilter, WorkflowStepRow,
};

const COLUMNS: &str = "id, employee_id, year, month, cost_center, notes, status, current_stage, \
                        current_approval_step, submitted_at, approved_at, created_at, updated_at";

/// [`COLUMNS`] qualified with the `r` alias for joins.
const R_COLUMNS: &str = "r.id, r.employee_id, r.year, r.month, r.cost_center, r.notes, r.status, \
                          r.current_stage, r.current_approval_step, r.submitted_at, r.approved_at, \
                          r.created_at, r.updated_at";

const STEP_COLUMNS: &str = "id, report_id, position, role, state, approver_id, \
                             escalation_due_at, acted_at, created_at, updated_at";

const ACTION_COLUMNS: &str =
    "id, report_id, actor_id, action, comment, from_status, to_status, created_at";

pub struct ExpenseReportRepo;

impl ExpenseReportRepo {
    /// Insert a submitted report with its initial workflow and the
    /// submission log entry.
    pub async fn create(
        pool: &PgPool,
        input: &CreateExpenseReport,
        workflow: &ReportWorkflow,
        submitted_by: DbId,
    ) -> Result<ReportDetail, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO expense_reports
                (employee_id, year, month, cost_center, notes, status, current_stage,
                 current_approval_step)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let report = sqlx::query_as::<_, ExpenseReport>(&query)
            .bind(input.employee_id)
            .bind(input.year)
            .bind(input.month)
            .bind(&input.cost_center)
            .bind(&input.notes)
            .bind(workflow.status.as_str())
            .bind(workflow.stage.as_str())
            .bind(step_index(workflow.current_step))
            .fetch_one(&mut *tx)
            .await?;

        let step_query = format!(
            "INSERT INTO workflow_steps
                (report_id, position, role, state, approver_id, escalation_due_at, acted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {STEP_COLUMNS}"
        );
        let mut steps = Vec::with_capacity(workflow.steps.len());
        for (i, step) in workflow.steps.iter().enumerate() {
            let row = sqlx::query_as::<_, WorkflowStepRow>(&step_query)
                .bind(report.id)
                .bind(step_index(i))
                .bind(step.role.as_str())
                .bind(step.state.as_str())
                .bind(step.approver_id)
                .bind(step.escalation_due_at)
                .bind(step.acted_at)
                .fetch_one(&mut *tx)
                .await?;
            steps.push(row);
        }

        let entry = NewReportAction {
            actor_id: submitted_by,
            action: "submit".to_string(),
            comment: None,
            from_status: None,
            to_status: workflow.status.as_str().to_string(),
        };
        Self::insert_action(&mut tx, report.id, &entry).await?;

        tx.commit().await?;
        Ok(ReportDetail { report, steps })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ExpenseReport>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM expense_reports WHERE id = $1");
        sqlx::query_as::<_, ExpenseReport>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load a report together with its ordered steps.
    pub async fn find_detail(pool: &PgPool, id: DbId) -> Result<Option<ReportDetail>, sqlx::Error> {
        let Some(report) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let steps = Self::list_steps(pool, id).await?;
        Ok(Some(ReportDetail { report, steps }))
    }

    /// The report an employee submitted for a month, if any.
    pub async fn find_for_period(
        pool: &PgPool,
        employee_id: DbId,
        year: i32,
        month: i32,
    ) -> Result<Option<ExpenseReport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM expense_reports
             WHERE employee_id = $1 AND year = $2 AND month = $3"
        );
        sqlx::query_as::<_, ExpenseReport>(&query)
            .bind(employee_id)
            .bind(year)
            .bind(month)
            .fetch_optional(pool)
            .await
    }

    /// List reports matching `filter`, newest period first.
    pub async fn list(
        pool: &PgPool,
        filter: &ReportFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExpenseReport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM expense_reports r
             WHERE ($1::TEXT IS NULL OR r.status = $1)
               AND ($2::BIGINT IS NULL OR r.employee_id = $2)
               AND ($3::INT IS NULL OR r.year = $3)
               AND ($4::INT IS NULL OR r.month = $4)
               AND ($5::BIGINT IS NULL OR r.employee_id = $5 OR EXISTS (
                    SELECT 1 FROM workflow_steps s
                    WHERE s.report_id = r.id AND s.approver_id = $5))
             ORDER BY r.year DESC, r.month DESC, r.id DESC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, ExpenseReport>(&query)
            .bind(&filter.status)
            .bind(filter.employee_id)
            .bind(filter.year)
            .bind(filter.month)
            .bind(filter.visible_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Steps of a report in workflow order.
    pub async fn list_steps(
        pool: &PgPool,
        report_id: DbId,
    ) -> Result<Vec<WorkflowStepRow>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM workflow_steps WHERE report_id = $1 ORDER BY position"
        );
        sqlx::query_as::<_, WorkflowStepRow>(&query)
            .bind(report_id)
            .fetch_all(pool)
            .await
    }

    /// Reports with a pending step the given employee may act on. Admins
    /// see every pending report; finance employees see every report at the
    /// finance step.
    pub async fn list_pending_for(
        pool: &PgPool,
        actor_id: DbId,
        is_admin: bool,
        is_finance: bool,
    ) -> Result<Vec<ExpenseReport>, sqlx::Error> {
        let query = format!(
            "SELECT {R_COLUMNS} FROM expense_reports r
             JOIN workflow_steps s ON s.report_id = r.id AND s.state = 'pending'
             WHERE ($2 OR s.approver_id = $1 OR ($3 AND s.role = 'finance'))
               AND ($2 OR r.employee_id <> $1)
             ORDER BY s.escalation_due_at NULLS LAST, r.id"
        );
        sqlx::query_as::<_, ExpenseReport>(&query)
            .bind(actor_id)
            .bind(is_admin)
            .bind(is_finance)
            .fetch_all(pool)
            .await
    }

    /// Reports whose pending step passed its escalation deadline before `now`.
    pub async fn list_overdue(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<OverdueReport>, sqlx::Error> {
        sqlx::query_as::<_, OverdueReport>(
            "SELECT r.id AS report_id, r.employee_id, e.name AS employee_name, r.year, r.month,
                    r.status, s.role AS step_role, s.approver_id, s.escalation_due_at
             FROM expense_reports r
             JOIN workflow_steps s ON s.report_id = r.id
             JOIN employees e ON e.id = r.employee_id
             WHERE s.state = 'pending' AND s.escalation_due_at < $1
             ORDER BY s.escalation_due_at, r.id",
        )
        .bind(now)
        .fetch_all(pool)
        .await
    }

    /// Persist a workflow transition: report status, every step, and the
    /// action-log entry, atomically.
    ///
    /// `resubmitted` refreshes `submitted_at`. Returns `None` if the report
    /// no longer exists.
    pub async fn save_transition(
        pool: &PgPool,
        report_id: DbId,
        workflow: &ReportWorkflow,
        entry: &NewReportAction,
        resubmitted: bool,
    ) -> Result<Option<ReportDetail>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE expense_reports SET
                status = $2,
                current_stage = $3,
                current_approval_step = $4,
                approved_at = CASE WHEN $5 THEN COALESCE(approved_at, NOW()) ELSE NULL END,
                submitted_at = CASE WHEN $6 THEN NOW() ELSE submitted_at END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let Some(report) = sqlx::query_as::<_, ExpenseReport>(&query)
            .bind(report_id)
            .bind(workflow.status.as_str())
            .bind(workflow.stage.as_str())
            .bind(step_index(workflow.current_step))
            .bind(workflow.status == ReportStatus::Approved)
            .bind(resubmitted)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let step_query = format!(
            "UPDATE workflow_steps SET
                state = $3, approver_id = $4, escalation_due_at = $5, acted_at = $6
             WHERE report_id = $1 AND position = $2
             RETURNING {STEP_COLUMNS}"
        );
        let mut steps = Vec::with_capacity(workflow.steps.len());
        for (i, step) in workflow.steps.iter().enumerate() {
            let row = sqlx::query_as::<_, WorkflowStepRow>(&step_query)
                .bind(report_id)
                .bind(step_index(i))
                .bind(step.state.as_str())
                .bind(step.approver_id)
                .bind(step.escalation_due_at)
                .bind(step.acted_at)
                .fetch_one(&mut *tx)
                .await?;
            steps.push(row);
        }

        Self::insert_action(&mut tx, report_id, entry).await?;
        tx.commit().await?;

        tracing::debug!(
            report_id,
            status = %workflow.status.as_str(),
            action = %entry.action,
            "Workflow transition persisted",
        );
        Ok(Some(ReportDetail { report, steps }))
    }

    /// Record an action that does not change workflow state.
    pub async fn log_action(
        pool: &PgPool,
        report_id: DbId,
        entry: &NewReportAction,
    ) -> Result<ReportAction, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let action = Self::insert_action(&mut tx, report_id, entry).await?;
        tx.commit().await?;
        Ok(action)
    }

    /// Action history of a report, oldest first.
    pub async fn list_actions(
        pool: &PgPool,
        report_id: DbId,
    ) -> Result<Vec<ReportAction>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTION_COLUMNS} FROM report_actions
             WHERE report_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ReportAction>(&query)
            .bind(report_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a report. Steps, actions and notifications cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM expense_reports WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_action(
        tx: &mut Transaction<'_, Postgres>,
        report_id: DbId,
        entry: &NewReportAction,
    ) -> Result<ReportAction, sqlx::Error> {
        let query = format!(
            "INSERT INTO report_actions (report_id, actor_id, action, comment, from_status, to_status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ACTION_COLUMNS}"
        );
        sqlx::query_as::<_, ReportAction>(&query)
            .bind(report_id)
            .bind(entry.actor_id)
            .bind(&entry.action)
            .bind(&entry.comment)
            .bind(&entry.from_status)
            .bind(&entry.to_status)
            .fetch_one(&mut **tx)
            .await
    }
}

/// Position of a step as stored in `workflow_steps.position`.
fn step_index(i: usize) -> i32 {
    i32::try_from(i).unwrap_or(i32::MAX)
}
