//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across request handlers.
//! Handlers publish after the transition has been committed, so a
//! subscriber never sees an event for state that was rolled back.

use chrono::Utc;
use mileage_core::types::{DbId, Timestamp};
use mileage_core::workflow::NotifyTarget;
use tokio::sync::broadcast;

/// A report workflow event.
#[derive(Debug, Clone)]
pub struct WorkflowEvent {
    /// Dot-separated event name, e.g. `"report.submitted"`.
    pub event_type: String,
    pub report_id: DbId,
    /// Owner of the report.
    pub employee_id: DbId,
    pub employee_name: String,
    /// Report period.
    pub year: i32,
    pub month: i32,
    /// Employee who performed the action.
    pub actor_id: DbId,
    pub comment: Option<String>,
    /// Who should hear about it. `None` means nobody.
    pub notify: Option<NotifyTarget>,
    pub timestamp: Timestamp,
}

impl WorkflowEvent {
    /// Create an event for a report with no comment and no target.
    pub fn new(
        event_type: impl Into<String>,
        report_id: DbId,
        employee_id: DbId,
        employee_name: impl Into<String>,
        (year, month): (i32, i32),
        actor_id: DbId,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            report_id,
            employee_id,
            employee_name: employee_name.into(),
            year,
            month,
            actor_id,
            comment: None,
            notify: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_notify(mut self, target: Option<NotifyTarget>) -> Self {
        self.notify = target;
        self
    }
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// ```rust
/// use mileage_events::bus::{EventBus, WorkflowEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(WorkflowEvent::new("report.submitted", 1, 2, "Ana", (2026, 3), 2));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: WorkflowEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mileage_core::workflow::StepRole;

    fn event() -> WorkflowEvent {
        WorkflowEvent::new("report.submitted", 42, 7, "Ana", (2026, 3), 7)
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(event().with_notify(Some(NotifyTarget::Approver {
            role: StepRole::Supervisor,
            approver_id: Some(3),
        })));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "report.submitted");
        assert_eq!(received.report_id, 42);
        assert_eq!(
            received.notify,
            Some(NotifyTarget::Approver {
                role: StepRole::Supervisor,
                approver_id: Some(3)
            })
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(event());

        assert_eq!(rx1.recv().await.unwrap().report_id, 42);
        assert_eq!(rx2.recv().await.unwrap().report_id, 42);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        EventBus::default().publish(event());
    }

    #[test]
    fn blank_comment_is_dropped() {
        assert!(event().with_comment(Some("   ".into())).comment.is_none());
        assert_eq!(
            event().with_comment(Some("fix receipts".into())).comment.as_deref(),
            Some("fix receipts")
        );
    }
}
