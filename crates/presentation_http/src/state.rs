//! Application state shared across handlers

use application::TaskService;
use infrastructure::Telemetry;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Task use cases
    pub task_service: TaskService,
    /// Metric handles for middleware
    pub telemetry: Telemetry,
}

impl AppState {
    pub const fn new(task_service: TaskService, telemetry: Telemetry) -> Self {
        Self {
            task_service,
            telemetry,
        }
    }
}
