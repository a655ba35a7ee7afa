//! Telemetry: trace, metric and log export plus the explicit telemetry context
//!
//! Spans are plain `tracing` spans; the bootstrap bridges them (and log
//! events) into OpenTelemetry. Components that record metrics receive a
//! [`Telemetry`] value at construction instead of reaching for globals.

mod bootstrap;
mod context;
mod metrics;
pub mod propagation;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bootstrap::{
    Providers, Signal, TelemetryError, TelemetryHandle, build_providers, init_telemetry,
};
pub use context::Telemetry;
#[cfg(any(test, feature = "testing"))]
pub use metrics::RecordingRequestMetrics;
pub use metrics::{
    NoopRequestMetrics, OtelRequestMetrics, REQUEST_COUNTER, REQUEST_DURATION,
    RequestMetricsRecorder, RequestObservation,
};
