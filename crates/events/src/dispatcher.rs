//! Notification dispatcher.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus),
//! resolves each event's notification target to employees and writes one
//! `notifications` row per recipient. It runs as a long-lived background
//! task and exits when the bus sender is dropped.

use std::sync::Arc;

use mileage_core::roles::has_finance_capability;
use mileage_core::types::DbId;
use mileage_core::workflow::NotifyTarget;
use mileage_db::models::employee::Employee;
use mileage_db::models::notification::CreateNotification;
use mileage_db::repositories::{EmployeeRepo, NotificationRepo};
use mileage_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::WorkflowEvent;
use crate::email::EmailDelivery;
use crate::message;

/// Background service that delivers workflow notifications.
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Run the dispatch loop until the channel is closed.
    pub async fn run(
        pool: DbPool,
        mut receiver: broadcast::Receiver<WorkflowEvent>,
        email: Option<Arc<EmailDelivery>>,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::dispatch(&pool, &event, email.as_deref()).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            report_id = event.report_id,
                            "Failed to dispatch notification"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver one event. Returns the number of recipients notified.
    ///
    /// Email failures are logged and do not fail the dispatch; the in-app
    /// notification is already written.
    pub async fn dispatch(
        pool: &DbPool,
        event: &WorkflowEvent,
        email: Option<&EmailDelivery>,
    ) -> Result<usize, sqlx::Error> {
        let Some(target) = event.notify else {
            return Ok(0);
        };

        let recipients = resolve_recipients(pool, target, event.actor_id).await?;
        if recipients.is_empty() {
            tracing::warn!(
                event_type = %event.event_type,
                report_id = event.report_id,
                ?target,
                "Notification target resolved to no active employees"
            );
            return Ok(0);
        }

        let body = message::compose(event);
        for recipient in &recipients {
            NotificationRepo::create(
                pool,
                &CreateNotification {
                    recipient_id: recipient.id,
                    report_id: Some(event.report_id),
                    event_type: event.event_type.clone(),
                    message: body.clone(),
                },
            )
            .await?;

            if let Some(mailer) = email {
                if let Err(e) = mailer.deliver(&recipient.email, &event.event_type, &body).await {
                    tracing::warn!(
                        error = %e,
                        recipient_id = recipient.id,
                        "Failed to send notification email"
                    );
                }
            }
        }

        tracing::debug!(
            event_type = %event.event_type,
            report_id = event.report_id,
            recipients = recipients.len(),
            "Notifications dispatched"
        );
        Ok(recipients.len())
    }
}

/// Resolve a target to the active employees who should be notified.
pub async fn resolve_recipients(
    pool: &DbPool,
    target: NotifyTarget,
    actor_id: DbId,
) -> Result<Vec<Employee>, sqlx::Error> {
    match target {
        NotifyTarget::Employee(id)
        | NotifyTarget::Approver {
            approver_id: Some(id),
            ..
        } => Ok(EmployeeRepo::find_by_id(pool, id)
            .await?
            .filter(|e| e.is_active)
            .into_iter()
            .collect()),
        NotifyTarget::Approver {
            approver_id: None, ..
        } => {
            let active = EmployeeRepo::list_active(pool).await?;
            Ok(finance_recipients(active, actor_id))
        }
    }
}

/// Every finance-capable employee except the one who triggered the event.
pub fn finance_recipients(employees: Vec<Employee>, actor_id: DbId) -> Vec<Employee> {
    employees
        .into_iter()
        .filter(|e| e.is_active && e.id != actor_id)
        .filter(|e| has_finance_capability(&e.role, e.position.as_deref()))
        .collect()
}
