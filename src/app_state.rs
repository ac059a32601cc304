//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::service::DispatchService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Dispatch service carrying all business logic and in-memory state.
    pub dispatch: Arc<DispatchService>,
    /// Loaded configuration (stream cadences etc.).
    pub config: DispatchConfig,
}
