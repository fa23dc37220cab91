use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: mileage_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Workflow events are published here after each committed transition.
    pub event_bus: Arc<mileage_events::EventBus>,
}
