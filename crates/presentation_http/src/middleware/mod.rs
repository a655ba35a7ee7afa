//! HTTP middleware components
//!
//! Server span, body capture, request metrics and request validation.

pub mod body_capture;
pub mod request_metrics;
pub mod request_span;
pub mod validation;

pub use body_capture::{BodyCaptureLayer, MirroredBody};
pub use request_metrics::RequestMetricsLayer;
pub use request_span::ServerSpan;
pub use validation::{ValidatedJson, ValidationError};
