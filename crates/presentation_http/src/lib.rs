//! HTTP presentation layer for the task service
//!
//! Routes, handlers and the request instrumentation middleware.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use middleware::{
    BodyCaptureLayer, MirroredBody, RequestMetricsLayer, ServerSpan, ValidatedJson,
    ValidationError,
};
pub use routes::{cors_layer, create_app, create_router};
pub use state::AppState;
