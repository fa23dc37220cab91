//! Human-readable notification text for workflow events.

use mileage_core::workflow::{
    EVENT_APPROVED, EVENT_COMMENTED, EVENT_DELEGATED, EVENT_REJECTED, EVENT_REMINDER,
    EVENT_RESUBMITTED, EVENT_RESUBMITTED_TO_FINANCE, EVENT_REVISION_REQUESTED,
    EVENT_STEP_APPROVED, EVENT_SUBMITTED,
};

use crate::bus::WorkflowEvent;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// "March 2026"
pub fn period_label(year: i32, month: i32) -> String {
    let name = usize::try_from(month - 1)
        .ok()
        .and_then(|i| MONTHS.get(i))
        .copied()
        .unwrap_or("Unknown month");
    format!("{name} {year}")
}

/// Notification body for an event.
pub fn compose(event: &WorkflowEvent) -> String {
    let report = format!(
        "{}'s expense report for {}",
        event.employee_name,
        period_label(event.year, event.month)
    );

    let base = match event.event_type.as_str() {
        EVENT_SUBMITTED | EVENT_STEP_APPROVED => format!("{report} is awaiting your approval."),
        EVENT_RESUBMITTED => format!("{report} was resubmitted and is awaiting your approval."),
        EVENT_RESUBMITTED_TO_FINANCE => {
            format!("{report} was corrected and returned to finance.")
        }
        EVENT_APPROVED => format!("{report} has been fully approved."),
        EVENT_REVISION_REQUESTED => format!("{report} needs revision."),
        EVENT_REJECTED => format!("{report} was rejected and returned for changes."),
        EVENT_DELEGATED => format!("{report} was delegated to you for approval."),
        EVENT_REMINDER => format!("Reminder: {report} is still awaiting your approval."),
        EVENT_COMMENTED => format!("New comment on {report}."),
        other => format!("{report}: {other}"),
    };

    match &event.comment {
        Some(comment) => format!("{base} Comment: \"{comment}\""),
        None => base,
    }
}
