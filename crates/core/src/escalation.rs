//! Escalation deadlines for pending approval steps.
//!
//! Deadlines are passive: they are stamped on a step when it becomes
//! pending and can be queried, but nothing acts on them automatically.

use chrono::Duration;

use crate::types::Timestamp;
use crate::workflow::{StepRole, StepState, WorkflowStep};

/// Hours a senior staff member has to act on a pending step.
pub const SENIOR_STAFF_ESCALATION_HOURS: i64 = 48;

/// Hours a supervisor has to act on a pending step.
pub const SUPERVISOR_ESCALATION_HOURS: i64 = 48;

/// Hours finance has to act on a pending step.
pub const FINANCE_ESCALATION_HOURS: i64 = 72;

/// The window an approver of the given role has before a step is overdue.
pub fn escalation_window(role: StepRole) -> Duration {
    let hours = match role {
        StepRole::SeniorStaff => SENIOR_STAFF_ESCALATION_HOURS,
        StepRole::Supervisor => SUPERVISOR_ESCALATION_HOURS,
        StepRole::Finance => FINANCE_ESCALATION_HOURS,
    };
    Duration::hours(hours)
}

/// Deadline for a step of `role` that becomes pending at `now`.
pub fn escalation_due_at(role: StepRole, now: Timestamp) -> Timestamp {
    now + escalation_window(role)
}

/// Whether a step is pending past its deadline.
pub fn is_overdue(step: &WorkflowStep, now: Timestamp) -> bool {
    step.state == StepState::Pending && step.escalation_due_at.is_some_and(|due| due < now)
}
