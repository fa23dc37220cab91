//! Workflow event bus and notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`WorkflowEvent`]: the envelope published for every report transition.
//! - [`NotificationDispatcher`]: background service turning events into
//!   `notifications` rows and, when SMTP is configured, emails.

pub mod bus;
pub mod dispatcher;
pub mod email;
pub mod message;

pub use bus::{EventBus, WorkflowEvent};
pub use dispatcher::NotificationDispatcher;
pub use email::{EmailConfig, EmailDelivery};
