//! Expense-report approval workflow engine.
//!
//! A report moves through an ordered list of approval steps fixed at
//! submission time:
//!
//! ```text
//! Senior Staff -> Supervisor -> Finance     (employee has senior staff)
//!                 Supervisor -> Finance     (otherwise)
//! ```
//!
//! Every function here is pure: it takes the current [`ReportWorkflow`] and
//! returns a [`Transition`] holding the new workflow plus who to notify.
//! The acting step is always located by scanning step states, never by
//! trusting the stored `current_step` index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::escalation::escalation_due_at;
use crate::types::{DbId, Timestamp};

/* --------------------------------------------------------------------------
Event names
-------------------------------------------------------------------------- */

pub const EVENT_SUBMITTED: &str = "report.submitted";
pub const EVENT_STEP_APPROVED: &str = "report.step_approved";
pub const EVENT_APPROVED: &str = "report.approved";
pub const EVENT_REVISION_REQUESTED: &str = "report.revision_requested";
pub const EVENT_REJECTED: &str = "report.rejected";
pub const EVENT_RESUBMITTED: &str = "report.resubmitted";
pub const EVENT_RESUBMITTED_TO_FINANCE: &str = "report.resubmitted_to_finance";
pub const EVENT_DELEGATED: &str = "report.delegated";
pub const EVENT_REMINDER: &str = "report.reminder";
pub const EVENT_COMMENTED: &str = "report.commented";

/* --------------------------------------------------------------------------
Enumerations
-------------------------------------------------------------------------- */

/// The approver role owning a workflow step. Declaration order is the
/// order steps appear in a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    SeniorStaff,
    Supervisor,
    Finance,
}

impl StepRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StepRole::SeniorStaff => "senior_staff",
            StepRole::Supervisor => "supervisor",
            StepRole::Finance => "finance",
        }
    }

    /// Human-readable label used in error and notification messages.
    pub fn label(self) -> &'static str {
        match self {
            StepRole::SeniorStaff => "Senior Staff",
            StepRole::Supervisor => "Supervisor",
            StepRole::Finance => "Finance",
        }
    }

    /// Report status while this role holds the report.
    pub fn pending_status(self) -> ReportStatus {
        match self {
            StepRole::SeniorStaff => ReportStatus::PendingSeniorStaff,
            StepRole::Supervisor => ReportStatus::PendingSupervisor,
            StepRole::Finance => ReportStatus::PendingFinance,
        }
    }

    /// Stage while this role holds the report.
    pub fn stage(self) -> Stage {
        match self {
            StepRole::SeniorStaff => Stage::PendingSeniorStaff,
            StepRole::Supervisor => Stage::PendingSupervisor,
            StepRole::Finance => Stage::PendingFinance,
        }
    }
}

impl FromStr for StepRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "senior_staff" => Ok(StepRole::SeniorStaff),
            "supervisor" => Ok(StepRole::Supervisor),
            "finance" => Ok(StepRole::Finance),
            other => Err(CoreError::Validation(format!("Invalid step role '{other}'"))),
        }
    }
}

/// State of a single workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Waiting,
    Approved,
    RevisionRequested,
}

impl StepState {
    pub fn as_str(self) -> &'static str {
        match self {
            StepState::Pending => "pending",
            StepState::Waiting => "waiting",
            StepState::Approved => "approved",
            StepState::RevisionRequested => "revision_requested",
        }
    }
}

impl FromStr for StepState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StepState::Pending),
            "waiting" => Ok(StepState::Waiting),
            "approved" => Ok(StepState::Approved),
            "revision_requested" => Ok(StepState::RevisionRequested),
            other => Err(CoreError::Validation(format!("Invalid step state '{other}'"))),
        }
    }
}

/// Overall report status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    PendingSeniorStaff,
    PendingSupervisor,
    PendingFinance,
    NeedsRevision,
    Approved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::PendingSeniorStaff => "pending_senior_staff",
            ReportStatus::PendingSupervisor => "pending_supervisor",
            ReportStatus::PendingFinance => "pending_finance",
            ReportStatus::NeedsRevision => "needs_revision",
            ReportStatus::Approved => "approved",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_senior_staff" => Ok(ReportStatus::PendingSeniorStaff),
            "pending_supervisor" => Ok(ReportStatus::PendingSupervisor),
            "pending_finance" => Ok(ReportStatus::PendingFinance),
            "needs_revision" => Ok(ReportStatus::NeedsRevision),
            "approved" => Ok(ReportStatus::Approved),
            other => Err(CoreError::Validation(format!("Invalid report status '{other}'"))),
        }
    }
}

/// Who currently holds the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PendingSeniorStaff,
    PendingSupervisor,
    PendingFinance,
    Employee,
    Completed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PendingSeniorStaff => "pending_senior_staff",
            Stage::PendingSupervisor => "pending_supervisor",
            Stage::PendingFinance => "pending_finance",
            Stage::Employee => "employee",
            Stage::Completed => "completed",
        }
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_senior_staff" => Ok(Stage::PendingSeniorStaff),
            "pending_supervisor" => Ok(Stage::PendingSupervisor),
            "pending_finance" => Ok(Stage::PendingFinance),
            "employee" => Ok(Stage::Employee),
            "completed" => Ok(Stage::Completed),
            other => Err(CoreError::Validation(format!("Invalid stage '{other}'"))),
        }
    }
}

/// An action an actor can take on a submitted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Approve,
    RequestRevisionToSupervisor,
    RequestRevisionToSeniorStaff,
    RequestRevisionToEmployee,
    ResubmitToFinance,
    Reject,
    Delegate,
    Remind,
    Comment,
}

impl WorkflowAction {
    pub const ALL: &'static [WorkflowAction] = &[
        WorkflowAction::Approve,
        WorkflowAction::RequestRevisionToSupervisor,
        WorkflowAction::RequestRevisionToSeniorStaff,
        WorkflowAction::RequestRevisionToEmployee,
        WorkflowAction::ResubmitToFinance,
        WorkflowAction::Reject,
        WorkflowAction::Delegate,
        WorkflowAction::Remind,
        WorkflowAction::Comment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowAction::Approve => "approve",
            WorkflowAction::RequestRevisionToSupervisor => "request_revision_to_supervisor",
            WorkflowAction::RequestRevisionToSeniorStaff => "request_revision_to_senior_staff",
            WorkflowAction::RequestRevisionToEmployee => "request_revision_to_employee",
            WorkflowAction::ResubmitToFinance => "resubmit_to_finance",
            WorkflowAction::Reject => "reject",
            WorkflowAction::Delegate => "delegate",
            WorkflowAction::Remind => "remind",
            WorkflowAction::Comment => "comment",
        }
    }

    /// Whether the action leaves the workflow untouched.
    pub fn is_informational(self) -> bool {
        matches!(self, WorkflowAction::Remind | WorkflowAction::Comment)
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowAction::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = WorkflowAction::ALL.iter().map(|a| a.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid action '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

/* --------------------------------------------------------------------------
Workflow state
-------------------------------------------------------------------------- */

/// One approval step of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub role: StepRole,
    pub state: StepState,
    /// Assigned approver. `None` for finance steps, which any finance
    /// employee may action.
    pub approver_id: Option<DbId>,
    pub escalation_due_at: Option<Timestamp>,
    pub acted_at: Option<Timestamp>,
}

impl WorkflowStep {
    fn new(role: StepRole, approver_id: Option<DbId>) -> Self {
        Self {
            role,
            state: StepState::Waiting,
            approver_id,
            escalation_due_at: None,
            acted_at: None,
        }
    }

    /// Whether `actor` is entitled to act on this step.
    pub fn can_be_actioned_by(&self, actor: &Actor) -> bool {
        actor.is_admin
            || self.approver_id == Some(actor.id)
            || (self.role == StepRole::Finance && actor.is_finance)
    }
}

/// The complete workflow state of one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportWorkflow {
    pub status: ReportStatus,
    pub stage: Stage,
    pub current_step: usize,
    pub steps: Vec<WorkflowStep>,
}

/// The approvers above an employee at submission time.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrgChain {
    pub senior_staff_id: Option<DbId>,
    pub supervisor_id: Option<DbId>,
}

/// The employee performing an action, with their resolved capabilities.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: DbId,
    pub is_admin: bool,
    pub is_finance: bool,
}

/// Who should be notified about a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    /// The report owner.
    Employee(DbId),
    /// The approver of a step. `approver_id` is `None` for finance, meaning
    /// every finance employee.
    Approver {
        role: StepRole,
        approver_id: Option<DbId>,
    },
}

/// Outcome of applying an action.
#[derive(Debug, Clone)]
pub struct Transition {
    pub workflow: ReportWorkflow,
    pub notify: Option<NotifyTarget>,
    pub event: &'static str,
}

/// Input to [`apply_action`].
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    pub action: WorkflowAction,
    pub actor: Actor,
    pub owner_id: DbId,
    pub comment: Option<&'a str>,
    pub delegate_to: Option<DbId>,
    pub now: Timestamp,
}

impl ReportWorkflow {
    /// Build the initial workflow for a newly submitted report.
    pub fn initialize(chain: &OrgChain, now: Timestamp) -> Result<Self, CoreError> {
        let supervisor_id = chain.supervisor_id.ok_or_else(|| {
            CoreError::Validation(
                "Employee has no supervisor assigned; the report cannot be routed".to_string(),
            )
        })?;

        let mut steps = Vec::with_capacity(3);
        if let Some(senior) = chain.senior_staff_id {
            steps.push(WorkflowStep::new(StepRole::SeniorStaff, Some(senior)));
        }
        steps.push(WorkflowStep::new(StepRole::Supervisor, Some(supervisor_id)));
        steps.push(WorkflowStep::new(StepRole::Finance, None));

        let mut wf = Self {
            status: ReportStatus::PendingSupervisor,
            stage: Stage::PendingSupervisor,
            current_step: 0,
            steps,
        };
        wf.hand_to(0, now);
        Ok(wf)
    }

    /// Index of the step with the given role, if the workflow has one.
    pub fn find_step(&self, role: StepRole) -> Option<usize> {
        self.steps.iter().position(|s| s.role == role)
    }

    /// Index of the single pending step, if any.
    pub fn pending_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.state == StepState::Pending)
    }

    /// The current step: the pending one, or the step that returned the
    /// report to the employee. `None` once approved.
    pub fn current(&self) -> Option<&WorkflowStep> {
        match self.stage {
            Stage::Completed => None,
            Stage::Employee => self
                .steps
                .iter()
                .find(|s| s.state == StepState::RevisionRequested),
            _ => self.pending_index().map(|i| &self.steps[i]),
        }
    }

    /// Verify the structural invariants of a workflow.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err("workflow has no steps".into());
        }
        if self.steps.windows(2).any(|w| w[0].role >= w[1].role) {
            return Err("workflow steps are out of order".into());
        }
        if self.steps.last().map(|s| s.role) != Some(StepRole::Finance) {
            return Err("workflow must end with a finance step".into());
        }
        if self.find_step(StepRole::Supervisor).is_none() {
            return Err("workflow must contain a supervisor step".into());
        }
        if self.current_step >= self.steps.len() {
            return Err("current_step is out of range".into());
        }

        let pending: Vec<usize> = indices_in(&self.steps, StepState::Pending);
        let revision: Vec<usize> = indices_in(&self.steps, StepState::RevisionRequested);

        for (i, step) in self.steps.iter().enumerate() {
            if (step.state == StepState::Pending) != step.escalation_due_at.is_some() {
                return Err(format!("step {i} escalation deadline does not match its state"));
            }
        }

        match self.stage {
            Stage::Completed => {
                if self.status != ReportStatus::Approved {
                    return Err("completed report must have status approved".into());
                }
                if self.steps.iter().any(|s| s.state != StepState::Approved) {
                    return Err("approved report has unapproved steps".into());
                }
            }
            Stage::Employee => {
                if self.status != ReportStatus::NeedsRevision {
                    return Err("employee-held report must have status needs_revision".into());
                }
                if !pending.is_empty() || revision.len() != 1 {
                    return Err("employee-held report must have exactly one current step".into());
                }
                if self.current_step != revision[0] {
                    return Err("current_step does not point at the current step".into());
                }
            }
            stage => {
                if pending.len() != 1 {
                    return Err(format!("expected one pending step, found {}", pending.len()));
                }
                let p = pending[0];
                let role = self.steps[p].role;
                if self.current_step != p {
                    return Err("current_step does not point at the pending step".into());
                }
                if stage != role.stage() {
                    return Err("stage does not match the pending step".into());
                }
                if self.status != ReportStatus::NeedsRevision && self.status != role.pending_status()
                {
                    return Err("status does not match the pending step".into());
                }
                if self.steps[..p].iter().any(|s| s.state != StepState::Approved) {
                    return Err("steps before the pending step must be approved".into());
                }
                if revision.len() > 1 || revision.iter().any(|&r| r < p) {
                    return Err("revision marker must follow the pending step".into());
                }
            }
        }
        Ok(())
    }

    /// Index of the step holding the report, or why nobody can act on it.
    fn holder(&self) -> Result<usize, CoreError> {
        match self.stage {
            Stage::Completed => Err(CoreError::Validation(
                "Report is already approved".to_string(),
            )),
            Stage::Employee => Err(CoreError::Validation(
                "Report is waiting for the employee to revise and resubmit".to_string(),
            )),
            _ => self.pending_index().ok_or_else(|| {
                CoreError::Internal(format!(
                    "Report in status '{}' has no pending step",
                    self.status.as_str()
                ))
            }),
        }
    }

    /// Make step `idx` the pending step and point status/stage at it.
    fn hand_to(&mut self, idx: usize, now: Timestamp) {
        let step = &mut self.steps[idx];
        step.state = StepState::Pending;
        step.escalation_due_at = Some(escalation_due_at(step.role, now));
        self.status = step.role.pending_status();
        self.stage = step.role.stage();
        self.current_step = idx;
    }

    fn set_waiting(&mut self, idx: usize) {
        let step = &mut self.steps[idx];
        step.state = StepState::Waiting;
        step.escalation_due_at = None;
    }

    fn mark(&mut self, idx: usize, state: StepState, now: Timestamp) {
        let step = &mut self.steps[idx];
        step.state = state;
        step.escalation_due_at = None;
        step.acted_at = Some(now);
    }

    /// Drop stale revision markers after `idx`.
    fn clear_revision_markers_after(&mut self, idx: usize) {
        for i in idx + 1..self.steps.len() {
            if self.steps[i].state == StepState::RevisionRequested {
                self.set_waiting(i);
            }
        }
    }

    fn approver_target(&self, idx: usize) -> NotifyTarget {
        let step = &self.steps[idx];
        NotifyTarget::Approver {
            role: step.role,
            approver_id: step.approver_id,
        }
    }
}

fn indices_in(steps: &[WorkflowStep], state: StepState) -> Vec<usize> {
    steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.state == state)
        .map(|(i, _)| i)
        .collect()
}

fn require_comment(comment: Option<&str>, action: WorkflowAction) -> Result<&str, CoreError> {
    comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| CoreError::Validation(format!("A comment is required to {action}")))
}

fn authorize(step: &WorkflowStep, req: &ActionRequest<'_>) -> Result<(), CoreError> {
    if req.actor.id == req.owner_id && !req.actor.is_admin {
        return Err(CoreError::Forbidden(
            "You cannot act on your own report".to_string(),
        ));
    }
    if !step.can_be_actioned_by(&req.actor) {
        return Err(CoreError::Forbidden(format!(
            "You are not the assigned {} approver for this report",
            step.role.label()
        )));
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Transitions
-------------------------------------------------------------------------- */

/// Start the workflow for a newly submitted report.
pub fn submit(chain: &OrgChain, now: Timestamp) -> Result<Transition, CoreError> {
    let workflow = ReportWorkflow::initialize(chain, now)?;
    let notify = Some(workflow.approver_target(workflow.current_step));
    Ok(Transition {
        workflow,
        notify,
        event: EVENT_SUBMITTED,
    })
}

/// Employee resubmission after a revision request. Restarts the workflow
/// at its earliest step.
pub fn resubmit(
    wf: &ReportWorkflow,
    actor: &Actor,
    owner_id: DbId,
    now: Timestamp,
) -> Result<Transition, CoreError> {
    if actor.id != owner_id && !actor.is_admin {
        return Err(CoreError::Forbidden(
            "Only the report owner can resubmit a report".to_string(),
        ));
    }
    if wf.status != ReportStatus::NeedsRevision || wf.stage != Stage::Employee {
        return Err(CoreError::Validation(
            "Only reports returned to the employee can be resubmitted".to_string(),
        ));
    }

    let mut next = wf.clone();
    for i in 0..next.steps.len() {
        next.set_waiting(i);
    }
    next.hand_to(0, now);
    let notify = Some(next.approver_target(0));

    Ok(Transition {
        workflow: next,
        notify,
        event: EVENT_RESUBMITTED,
    })
}

/// Apply a workflow action to a submitted report.
pub fn apply_action(wf: &ReportWorkflow, req: &ActionRequest<'_>) -> Result<Transition, CoreError> {
    match req.action {
        WorkflowAction::Approve => approve(wf, req),
        WorkflowAction::RequestRevisionToSupervisor => {
            request_revision(wf, req, Some(StepRole::Supervisor))
        }
        WorkflowAction::RequestRevisionToSeniorStaff => {
            request_revision(wf, req, Some(StepRole::SeniorStaff))
        }
        WorkflowAction::RequestRevisionToEmployee => request_revision(wf, req, None),
        WorkflowAction::ResubmitToFinance => resubmit_to_finance(wf, req),
        WorkflowAction::Reject => {
            require_comment(req.comment, req.action)?;
            let idx = wf.holder()?;
            authorize(&wf.steps[idx], req)?;
            Ok(return_to_employee(wf, idx, req, EVENT_REJECTED))
        }
        WorkflowAction::Delegate => delegate(wf, req),
        WorkflowAction::Remind => remind(wf, req),
        WorkflowAction::Comment => comment(wf, req),
    }
}

fn approve(wf: &ReportWorkflow, req: &ActionRequest<'_>) -> Result<Transition, CoreError> {
    let idx = wf.holder()?;
    authorize(&wf.steps[idx], req)?;

    let mut next = wf.clone();
    next.mark(idx, StepState::Approved, req.now);

    if idx + 1 < next.steps.len() {
        next.hand_to(idx + 1, req.now);
        let notify = Some(next.approver_target(idx + 1));
        return Ok(Transition {
            workflow: next,
            notify,
            event: EVENT_STEP_APPROVED,
        });
    }

    next.status = ReportStatus::Approved;
    next.stage = Stage::Completed;
    next.current_step = idx;
    Ok(Transition {
        workflow: next,
        notify: Some(NotifyTarget::Employee(req.owner_id)),
        event: EVENT_APPROVED,
    })
}

fn request_revision(
    wf: &ReportWorkflow,
    req: &ActionRequest<'_>,
    destination: Option<StepRole>,
) -> Result<Transition, CoreError> {
    let idx = wf.holder()?;
    authorize(&wf.steps[idx], req)?;

    let Some(dest) = destination.and_then(|role| wf.find_step(role)) else {
        return Ok(return_to_employee(wf, idx, req, EVENT_REVISION_REQUESTED));
    };

    if dest >= idx {
        return Err(CoreError::Validation(format!(
            "{} cannot send a report back to {}",
            wf.steps[idx].role.label(),
            wf.steps[dest].role.label()
        )));
    }

    let mut next = wf.clone();
    next.hand_to(dest, req.now);
    for i in dest + 1..idx {
        next.set_waiting(i);
    }
    next.mark(idx, StepState::RevisionRequested, req.now);
    next.clear_revision_markers_after(idx);
    next.status = ReportStatus::NeedsRevision;

    let notify = Some(next.approver_target(dest));
    Ok(Transition {
        workflow: next,
        notify,
        event: EVENT_REVISION_REQUESTED,
    })
}

fn return_to_employee(
    wf: &ReportWorkflow,
    idx: usize,
    req: &ActionRequest<'_>,
    event: &'static str,
) -> Transition {
    let mut next = wf.clone();
    for i in 0..idx {
        next.set_waiting(i);
    }
    next.mark(idx, StepState::RevisionRequested, req.now);
    next.clear_revision_markers_after(idx);
    next.status = ReportStatus::NeedsRevision;
    next.stage = Stage::Employee;
    next.current_step = idx;

    Transition {
        workflow: next,
        notify: Some(NotifyTarget::Employee(req.owner_id)),
        event,
    }
}

fn resubmit_to_finance(
    wf: &ReportWorkflow,
    req: &ActionRequest<'_>,
) -> Result<Transition, CoreError> {
    let idx = wf.holder()?;
    authorize(&wf.steps[idx], req)?;

    let finance = wf
        .find_step(StepRole::Finance)
        .filter(|&f| f > idx && wf.steps[f].state == StepState::RevisionRequested)
        .ok_or_else(|| {
            CoreError::Validation(
                "resubmit_to_finance is only available after finance has requested a revision"
                    .to_string(),
            )
        })?;

    if let Some(blocking) = wf.steps[idx + 1..finance]
        .iter()
        .find(|s| s.state != StepState::Approved)
    {
        return Err(CoreError::Validation(format!(
            "{} must approve before the report can return to finance",
            blocking.role.label()
        )));
    }

    let mut next = wf.clone();
    next.mark(idx, StepState::Approved, req.now);
    next.hand_to(finance, req.now);

    let notify = Some(next.approver_target(finance));
    Ok(Transition {
        workflow: next,
        notify,
        event: EVENT_RESUBMITTED_TO_FINANCE,
    })
}

fn delegate(wf: &ReportWorkflow, req: &ActionRequest<'_>) -> Result<Transition, CoreError> {
    let idx = wf.holder()?;
    let step = &wf.steps[idx];
    authorize(step, req)?;

    if step.role == StepRole::Finance {
        return Err(CoreError::Validation(
            "Finance approval steps cannot be delegated".to_string(),
        ));
    }
    let target = req.delegate_to.ok_or_else(|| {
        CoreError::Validation("delegate_to is required for delegation".to_string())
    })?;
    if target == req.owner_id {
        return Err(CoreError::Validation(
            "A report cannot be delegated to its owner".to_string(),
        ));
    }
    if step.approver_id == Some(target) {
        return Err(CoreError::Validation(format!(
            "{} step is already assigned to employee {target}",
            step.role.label()
        )));
    }

    let mut next = wf.clone();
    next.steps[idx].approver_id = Some(target);

    Ok(Transition {
        notify: Some(next.approver_target(idx)),
        workflow: next,
        event: EVENT_DELEGATED,
    })
}

fn remind(wf: &ReportWorkflow, req: &ActionRequest<'_>) -> Result<Transition, CoreError> {
    if req.actor.id != req.owner_id && !req.actor.is_admin {
        return Err(CoreError::Forbidden(
            "Only the report owner or an admin can send reminders".to_string(),
        ));
    }
    let idx = wf.holder()?;

    Ok(Transition {
        workflow: wf.clone(),
        notify: Some(wf.approver_target(idx)),
        event: EVENT_REMINDER,
    })
}

fn comment(wf: &ReportWorkflow, req: &ActionRequest<'_>) -> Result<Transition, CoreError> {
    require_comment(req.comment, req.action)?;

    let is_owner = req.actor.id == req.owner_id;
    let is_participant =
        is_owner || wf.steps.iter().any(|s| s.can_be_actioned_by(&req.actor));
    if !is_participant {
        return Err(CoreError::Forbidden(
            "Only the report owner and its approvers can comment".to_string(),
        ));
    }

    let notify = if is_owner {
        wf.pending_index().map(|i| wf.approver_target(i))
    } else {
        Some(NotifyTarget::Employee(req.owner_id))
    };

    Ok(Transition {
        workflow: wf.clone(),
        notify,
        event: EVENT_COMMENTED,
    })
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    const OWNER: DbId = 1;
    const SENIOR: DbId = 2;
    const SUPERVISOR: DbId = 3;
    const FINANCE: DbId = 4;
    const ADMIN: DbId = 9;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()
    }

    fn staff(id: DbId) -> Actor {
        Actor {
            id,
            is_admin: false,
            is_finance: false,
        }
    }

    fn finance() -> Actor {
        Actor {
            id: FINANCE,
            is_admin: false,
            is_finance: true,
        }
    }

    fn admin() -> Actor {
        Actor {
            id: ADMIN,
            is_admin: true,
            is_finance: false,
        }
    }

    fn with_senior() -> ReportWorkflow {
        let chain = OrgChain {
            senior_staff_id: Some(SENIOR),
            supervisor_id: Some(SUPERVISOR),
        };
        submit(&chain, t0()).unwrap().workflow
    }

    fn without_senior() -> ReportWorkflow {
        let chain = OrgChain {
            senior_staff_id: None,
            supervisor_id: Some(SUPERVISOR),
        };
        submit(&chain, t0()).unwrap().workflow
    }

    fn act(
        wf: &ReportWorkflow,
        action: WorkflowAction,
        actor: Actor,
    ) -> Result<Transition, CoreError> {
        let req = ActionRequest {
            action,
            actor,
            owner_id: OWNER,
            comment: Some("please check the fuel receipt"),
            delegate_to: Some(7),
            now: t0() + Duration::hours(1),
        };
        let result = apply_action(wf, &req);
        if let Ok(t) = &result {
            t.workflow.check_invariants().unwrap();
        }
        result
    }

    fn ok(wf: &ReportWorkflow, action: WorkflowAction, actor: Actor) -> ReportWorkflow {
        act(wf, action, actor).unwrap().workflow
    }

    fn states(wf: &ReportWorkflow) -> Vec<StepState> {
        wf.steps.iter().map(|s| s.state).collect()
    }

    // -- submission ---------------------------------------------------------

    #[test]
    fn submit_without_senior_staff_starts_at_supervisor() {
        let wf = without_senior();
        wf.check_invariants().unwrap();
        assert_eq!(wf.status, ReportStatus::PendingSupervisor);
        assert_eq!(wf.stage, Stage::PendingSupervisor);
        assert_eq!(wf.current_step, 0);
        assert_eq!(
            wf.steps.iter().map(|s| s.role).collect::<Vec<_>>(),
            vec![StepRole::Supervisor, StepRole::Finance]
        );
        assert_eq!(states(&wf), vec![StepState::Pending, StepState::Waiting]);
        assert_eq!(wf.steps[0].escalation_due_at, Some(t0() + Duration::hours(48)));
    }

    #[test]
    fn submit_with_senior_staff_starts_at_senior_staff() {
        let t = submit(
            &OrgChain {
                senior_staff_id: Some(SENIOR),
                supervisor_id: Some(SUPERVISOR),
            },
            t0(),
        )
        .unwrap();
        assert_eq!(t.event, EVENT_SUBMITTED);
        assert_eq!(t.workflow.status, ReportStatus::PendingSeniorStaff);
        assert_eq!(t.workflow.steps.len(), 3);
        assert_eq!(
            t.notify,
            Some(NotifyTarget::Approver {
                role: StepRole::SeniorStaff,
                approver_id: Some(SENIOR)
            })
        );
    }

    #[test]
    fn submit_without_supervisor_is_rejected() {
        let result = submit(&OrgChain::default(), t0());
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    // -- approval chain -----------------------------------------------------

    #[test]
    fn full_chain_reaches_approved() {
        let wf = with_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SENIOR));
        assert_eq!(wf.status, ReportStatus::PendingSupervisor);

        let t = act(&wf, WorkflowAction::Approve, staff(SUPERVISOR)).unwrap();
        assert_eq!(t.workflow.status, ReportStatus::PendingFinance);
        assert_eq!(t.event, EVENT_STEP_APPROVED);
        assert_eq!(
            t.workflow.steps[2].escalation_due_at,
            Some(t0() + Duration::hours(1) + Duration::hours(72))
        );

        let t = act(&t.workflow, WorkflowAction::Approve, finance()).unwrap();
        assert_eq!(t.workflow.status, ReportStatus::Approved);
        assert_eq!(t.workflow.stage, Stage::Completed);
        assert_eq!(t.event, EVENT_APPROVED);
        assert_eq!(t.notify, Some(NotifyTarget::Employee(OWNER)));
        assert!(t.workflow.current().is_none());
    }

    #[test]
    fn approved_report_accepts_no_further_approval() {
        let wf = without_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        let wf = ok(&wf, WorkflowAction::Approve, finance());
        assert_matches!(
            act(&wf, WorkflowAction::Approve, finance()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn wrong_approver_is_forbidden() {
        let wf = with_senior();
        assert_matches!(
            act(&wf, WorkflowAction::Approve, staff(SUPERVISOR)),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            act(&wf, WorkflowAction::Approve, finance()),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn owner_cannot_approve_own_report_even_with_finance_capability() {
        let wf = without_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        let owner_in_finance = Actor {
            id: OWNER,
            is_admin: false,
            is_finance: true,
        };
        assert_matches!(
            act(&wf, WorkflowAction::Approve, owner_in_finance),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn admin_can_act_on_any_step() {
        let wf = with_senior();
        let wf = ok(&wf, WorkflowAction::Approve, admin());
        let wf = ok(&wf, WorkflowAction::Approve, admin());
        let wf = ok(&wf, WorkflowAction::Approve, admin());
        assert_eq!(wf.status, ReportStatus::Approved);
    }

    #[test]
    fn stale_current_step_does_not_misroute_approval() {
        let wf = without_senior();
        let mut wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        wf.current_step = 0;
        // The supervisor step is already approved; only finance may act.
        assert_matches!(
            act(&wf, WorkflowAction::Approve, staff(SUPERVISOR)),
            Err(CoreError::Forbidden(_))
        );
        let t = act(&wf, WorkflowAction::Approve, finance()).unwrap();
        assert_eq!(t.workflow.status, ReportStatus::Approved);
    }

    // -- revision loops -----------------------------------------------------

    #[test]
    fn finance_revision_to_supervisor_from_pending_finance() {
        for wf in [with_senior(), without_senior()] {
            let mut wf = wf;
            while wf.status != ReportStatus::PendingFinance {
                wf = ok(&wf, WorkflowAction::Approve, admin());
            }
            let t = act(&wf, WorkflowAction::RequestRevisionToSupervisor, finance()).unwrap();
            let sup = t.workflow.find_step(StepRole::Supervisor).unwrap();
            let fin = t.workflow.find_step(StepRole::Finance).unwrap();

            assert_eq!(t.workflow.status, ReportStatus::NeedsRevision);
            assert_eq!(t.workflow.stage, Stage::PendingSupervisor);
            assert_eq!(t.workflow.steps[fin].state, StepState::RevisionRequested);
            assert_eq!(t.workflow.steps[sup].state, StepState::Pending);
            assert_eq!(t.workflow.current_step, sup);
            assert_eq!(
                t.notify,
                Some(NotifyTarget::Approver {
                    role: StepRole::Supervisor,
                    approver_id: Some(SUPERVISOR)
                })
            );
        }
    }

    #[test]
    fn supervisor_reapproval_returns_report_to_finance() {
        let wf = without_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        let wf = ok(&wf, WorkflowAction::RequestRevisionToSupervisor, finance());
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        assert_eq!(wf.status, ReportStatus::PendingFinance);
        assert_eq!(states(&wf), vec![StepState::Approved, StepState::Pending]);
    }

    #[test]
    fn revision_to_senior_staff_resets_intermediate_steps() {
        let wf = with_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SENIOR));
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        let wf = ok(&wf, WorkflowAction::RequestRevisionToSeniorStaff, finance());
        assert_eq!(wf.stage, Stage::PendingSeniorStaff);
        assert_eq!(
            states(&wf),
            vec![
                StepState::Pending,
                StepState::Waiting,
                StepState::RevisionRequested
            ]
        );
    }

    #[test]
    fn missing_senior_staff_step_falls_back_to_employee() {
        let wf = without_senior();
        let t = act(&wf, WorkflowAction::RequestRevisionToSeniorStaff, staff(SUPERVISOR)).unwrap();
        assert_eq!(t.workflow.status, ReportStatus::NeedsRevision);
        assert_eq!(t.workflow.stage, Stage::Employee);
        assert_eq!(t.notify, Some(NotifyTarget::Employee(OWNER)));
    }

    #[test]
    fn revision_cannot_target_own_or_later_step() {
        let wf = with_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SENIOR));
        assert_matches!(
            act(&wf, WorkflowAction::RequestRevisionToSupervisor, staff(SUPERVISOR)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn revision_to_employee_resets_earlier_steps() {
        let wf = with_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SENIOR));
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        let t = act(&wf, WorkflowAction::RequestRevisionToEmployee, finance()).unwrap();
        assert_eq!(t.workflow.stage, Stage::Employee);
        assert_eq!(t.workflow.current_step, 2);
        assert_eq!(
            states(&t.workflow),
            vec![
                StepState::Waiting,
                StepState::Waiting,
                StepState::RevisionRequested
            ]
        );
    }

    #[test]
    fn reject_requires_comment() {
        let wf = without_senior();
        let req = ActionRequest {
            action: WorkflowAction::Reject,
            actor: staff(SUPERVISOR),
            owner_id: OWNER,
            comment: Some("   "),
            delegate_to: None,
            now: t0(),
        };
        assert_matches!(apply_action(&wf, &req), Err(CoreError::Validation(_)));

        let t = act(&wf, WorkflowAction::Reject, staff(SUPERVISOR)).unwrap();
        assert_eq!(t.event, EVENT_REJECTED);
        assert_eq!(t.workflow.stage, Stage::Employee);
    }

    #[test]
    fn resubmit_to_finance_after_finance_revision() {
        let wf = without_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        let wf = ok(&wf, WorkflowAction::RequestRevisionToSupervisor, finance());
        let t = act(&wf, WorkflowAction::ResubmitToFinance, staff(SUPERVISOR)).unwrap();
        assert_eq!(t.event, EVENT_RESUBMITTED_TO_FINANCE);
        assert_eq!(t.workflow.status, ReportStatus::PendingFinance);
    }

    #[test]
    fn resubmit_to_finance_blocked_by_unapproved_supervisor() {
        let wf = with_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SENIOR));
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        let wf = ok(&wf, WorkflowAction::RequestRevisionToSeniorStaff, finance());
        let err = act(&wf, WorkflowAction::ResubmitToFinance, staff(SENIOR)).unwrap_err();
        assert!(err.to_string().contains("Supervisor must approve"));
    }

    #[test]
    fn resubmit_to_finance_requires_finance_revision() {
        let wf = without_senior();
        assert_matches!(
            act(&wf, WorkflowAction::ResubmitToFinance, staff(SUPERVISOR)),
            Err(CoreError::Validation(_))
        );
    }

    // -- employee resubmission ----------------------------------------------

    #[test]
    fn resubmission_restarts_at_earliest_stage() {
        for (wf, first) in [
            (with_senior(), StepRole::SeniorStaff),
            (without_senior(), StepRole::Supervisor),
        ] {
            let mut wf = wf;
            while wf.status != ReportStatus::PendingFinance {
                wf = ok(&wf, WorkflowAction::Approve, admin());
            }
            let wf = ok(&wf, WorkflowAction::RequestRevisionToEmployee, finance());
            let t = resubmit(&wf, &staff(OWNER), OWNER, t0() + Duration::days(2)).unwrap();
            t.workflow.check_invariants().unwrap();
            assert_eq!(t.workflow.status, first.pending_status());
            assert_eq!(t.workflow.current_step, 0);
            assert!(t.workflow.steps[1..]
                .iter()
                .all(|s| s.state == StepState::Waiting));
        }
    }

    #[test]
    fn resubmit_only_when_returned_to_employee() {
        let wf = without_senior();
        assert_matches!(
            resubmit(&wf, &staff(OWNER), OWNER, t0()),
            Err(CoreError::Validation(_))
        );
        let wf = ok(&wf, WorkflowAction::RequestRevisionToEmployee, staff(SUPERVISOR));
        assert_matches!(
            resubmit(&wf, &staff(SUPERVISOR), OWNER, t0()),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn approvers_cannot_act_while_employee_holds_report() {
        let wf = without_senior();
        let wf = ok(&wf, WorkflowAction::RequestRevisionToEmployee, staff(SUPERVISOR));
        assert_matches!(
            act(&wf, WorkflowAction::Approve, staff(SUPERVISOR)),
            Err(CoreError::Validation(_))
        );
    }

    // -- delegation, reminders, comments ------------------------------------

    #[test]
    fn delegation_reassigns_approver_only() {
        let wf = without_senior();
        let t = act(&wf, WorkflowAction::Delegate, staff(SUPERVISOR)).unwrap();
        assert_eq!(t.workflow.steps[0].approver_id, Some(7));
        assert_eq!(t.workflow.status, wf.status);
        assert_eq!(states(&t.workflow), states(&wf));
        assert_eq!(t.workflow.steps[0].escalation_due_at, wf.steps[0].escalation_due_at);

        assert_matches!(
            act(&t.workflow, WorkflowAction::Approve, staff(SUPERVISOR)),
            Err(CoreError::Forbidden(_))
        );
        let wf = ok(&t.workflow, WorkflowAction::Approve, staff(7));
        assert_eq!(wf.status, ReportStatus::PendingFinance);
    }

    #[test]
    fn finance_step_cannot_be_delegated() {
        let wf = without_senior();
        let wf = ok(&wf, WorkflowAction::Approve, staff(SUPERVISOR));
        assert_matches!(
            act(&wf, WorkflowAction::Delegate, finance()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn delegation_requires_target() {
        let wf = without_senior();
        let req = ActionRequest {
            action: WorkflowAction::Delegate,
            actor: staff(SUPERVISOR),
            owner_id: OWNER,
            comment: None,
            delegate_to: None,
            now: t0(),
        };
        assert_matches!(apply_action(&wf, &req), Err(CoreError::Validation(_)));
    }

    #[test]
    fn reminder_notifies_current_approver_without_change() {
        let wf = with_senior();
        let t = act(&wf, WorkflowAction::Remind, staff(OWNER)).unwrap();
        assert_eq!(t.workflow, wf);
        assert_eq!(
            t.notify,
            Some(NotifyTarget::Approver {
                role: StepRole::SeniorStaff,
                approver_id: Some(SENIOR)
            })
        );
        assert_matches!(
            act(&wf, WorkflowAction::Remind, staff(SUPERVISOR)),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn comment_routes_to_the_other_party() {
        let wf = without_senior();
        let from_owner = act(&wf, WorkflowAction::Comment, staff(OWNER)).unwrap();
        assert_eq!(
            from_owner.notify,
            Some(NotifyTarget::Approver {
                role: StepRole::Supervisor,
                approver_id: Some(SUPERVISOR)
            })
        );
        let from_approver = act(&wf, WorkflowAction::Comment, staff(SUPERVISOR)).unwrap();
        assert_eq!(from_approver.notify, Some(NotifyTarget::Employee(OWNER)));
        assert_matches!(
            act(&wf, WorkflowAction::Comment, staff(42)),
            Err(CoreError::Forbidden(_))
        );
    }

    // -- parsing ------------------------------------------------------------

    #[test]
    fn actions_parse_from_wire_names() {
        for action in WorkflowAction::ALL {
            assert_eq!(action.as_str().parse::<WorkflowAction>().unwrap(), *action);
        }
        let err = "escalate".parse::<WorkflowAction>().unwrap_err();
        assert!(err.to_string().contains("Invalid action 'escalate'"));
    }

    #[test]
    fn statuses_and_stages_parse_from_db_values() {
        assert_eq!("needs_revision".parse::<ReportStatus>().unwrap(), ReportStatus::NeedsRevision);
        assert_eq!("employee".parse::<Stage>().unwrap(), Stage::Employee);
        assert_eq!(
            "revision_requested".parse::<StepState>().unwrap(),
            StepState::RevisionRequested
        );
        assert!("rejected".parse::<ReportStatus>().is_err());
    }

    // -- exhaustive exploration ---------------------------------------------

    /// Apply every action by every actor from every reachable state (to a
    /// bounded depth) and check the invariants after each accepted one.
    #[test]
    fn invariants_hold_across_reachable_states() {
        let actors = [staff(OWNER), staff(SENIOR), staff(SUPERVISOR), finance(), admin(), staff(7)];
        let mut frontier = vec![with_senior(), without_senior()];
        let mut accepted = 0usize;

        for _depth in 0..4 {
            let mut next_frontier = Vec::new();
            for wf in &frontier {
                for action in WorkflowAction::ALL {
                    for actor in actors {
                        if let Ok(t) = act(wf, *action, actor) {
                            accepted += 1;
                            if !action.is_informational() {
                                next_frontier.push(t.workflow);
                            }
                        }
                    }
                }
                if let Ok(t) = resubmit(wf, &staff(OWNER), OWNER, t0()) {
                    t.workflow.check_invariants().unwrap();
                    next_frontier.push(t.workflow);
                }
            }
            next_frontier.dedup();
            frontier = next_frontier;
        }
        assert!(accepted > 100);
    }
}
