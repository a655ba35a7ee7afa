//! Per-request metric instruments

use std::{fmt, time::Duration};

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};

/// Counter of handled requests
pub const REQUEST_COUNTER: &str = "todo_app.requests";

/// Histogram of request durations in milliseconds
pub const REQUEST_DURATION: &str = "todo_app.request_duration";

/// One handled request, as seen by the metrics middleware
#[derive(Debug, Clone, PartialEq)]
pub struct RequestObservation {
    /// HTTP method
    pub method: String,
    /// Matched route template, e.g. `/tasks/{id}`
    pub endpoint: String,
    /// Final response status
    pub status_code: u16,
    /// Wall time spent handling the request
    pub duration: Duration,
}

impl RequestObservation {
    pub fn new(
        method: impl Into<String>,
        endpoint: impl Into<String>,
        status_code: u16,
        duration: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            status_code,
            duration,
        }
    }

    /// Duration in fractional milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }

    fn attributes(&self) -> [KeyValue; 3] {
        [
            KeyValue::new("method", self.method.clone()),
            KeyValue::new("endpoint", self.endpoint.clone()),
            KeyValue::new("status_code", i64::from(self.status_code)),
        ]
    }
}

/// Sink for request count and duration
pub trait RequestMetricsRecorder: Send + Sync + fmt::Debug {
    /// Record exactly one count and one duration for a handled request
    fn record(&self, observation: &RequestObservation);
}

/// Recorder backed by OpenTelemetry instruments
pub struct OtelRequestMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
}

impl fmt::Debug for OtelRequestMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtelRequestMetrics").finish_non_exhaustive()
    }
}

impl OtelRequestMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            requests: meter
                .u64_counter(REQUEST_COUNTER)
                .with_description("Number of handled requests")
                .with_unit("1")
                .build(),
            duration: meter
                .f64_histogram(REQUEST_DURATION)
                .with_description("Request handling time")
                .with_unit("ms")
                .build(),
        }
    }
}

impl RequestMetricsRecorder for OtelRequestMetrics {
    fn record(&self, observation: &RequestObservation) {
        let attributes = observation.attributes();
        self.requests.add(1, &attributes);
        self.duration.record(observation.duration_ms(), &attributes);
    }
}

/// Recorder that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRequestMetrics;

impl RequestMetricsRecorder for NoopRequestMetrics {
    fn record(&self, _observation: &RequestObservation) {}
}

/// Recorder that keeps every observation in memory for assertions
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct RecordingRequestMetrics {
    observations: parking_lot::Mutex<Vec<RequestObservation>>,
}

#[cfg(any(test, feature = "testing"))]
impl RecordingRequestMetrics {
    /// Snapshot of everything recorded so far
    pub fn observations(&self) -> Vec<RequestObservation> {
        self.observations.lock().clone()
    }
}

#[cfg(any(test, feature = "testing"))]
impl RequestMetricsRecorder for RecordingRequestMetrics {
    fn record(&self, observation: &RequestObservation) {
        self.observations.lock().push(observation.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_reported_in_milliseconds() {
        let obs = RequestObservation::new("GET", "/tasks", 200, Duration::from_micros(1500));
        assert!((obs.duration_ms() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn attributes_use_metric_label_names() {
        let obs = RequestObservation::new("POST", "/tasks", 400, Duration::ZERO);
        let keys: Vec<_> = obs
            .attributes()
            .iter()
            .map(|kv| kv.key.as_str().to_owned())
            .collect();
        assert_eq!(keys, ["method", "endpoint", "status_code"]);
    }

    #[test]
    fn recording_keeps_order() {
        let recorder = RecordingRequestMetrics::default();
        recorder.record(&RequestObservation::new("GET", "/tasks", 200, Duration::ZERO));
        recorder.record(&RequestObservation::new(
            "OPTIONS",
            "/tasks",
            200,
            Duration::ZERO,
        ));
        let seen = recorder.observations();
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[1].method, "OPTIONS");
    }
}
