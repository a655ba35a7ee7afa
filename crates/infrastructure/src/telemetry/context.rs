//! Explicit telemetry context handed to instrumented components

use std::{fmt, sync::Arc};

use opentelemetry::metrics::Meter;

use super::metrics::{NoopRequestMetrics, OtelRequestMetrics, RequestMetricsRecorder};

/// Metric handles shared by every instrumented component
///
/// Cheap to clone. Built once by the telemetry bootstrap, or as
/// [`Telemetry::noop`] where recordings should be discarded.
#[derive(Clone)]
pub struct Telemetry {
    request_metrics: Arc<dyn RequestMetricsRecorder>,
    meter: Option<Meter>,
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("request_metrics", &self.request_metrics)
            .field("meter", &self.meter.is_some())
            .finish()
    }
}

impl Telemetry {
    /// Context backed by OpenTelemetry instruments from `meter`
    pub fn new(meter: Meter) -> Self {
        Self {
            request_metrics: Arc::new(OtelRequestMetrics::new(&meter)),
            meter: Some(meter),
        }
    }

    /// Context that silently discards every recording
    pub fn noop() -> Self {
        Self::with_recorder(Arc::new(NoopRequestMetrics))
    }

    /// Context with a custom request metrics recorder and no meter
    pub fn with_recorder(recorder: Arc<dyn RequestMetricsRecorder>) -> Self {
        Self {
            request_metrics: recorder,
            meter: None,
        }
    }

    /// Recorder for per-request count and duration
    pub fn request_metrics(&self) -> &dyn RequestMetricsRecorder {
        self.request_metrics.as_ref()
    }

    /// Meter for components registering their own instruments
    pub const fn meter(&self) -> Option<&Meter> {
        self.meter.as_ref()
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::noop()
    }
}
