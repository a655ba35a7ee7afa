//! OpenTelemetry initialization
//!
//! Builds trace, metric and log pipelines that export either over OTLP/gRPC
//! (when an endpoint is configured) or to stdout, and installs the `tracing`
//! subscriber stack feeding them. Initialization either fully succeeds or
//! fails naming the exporter at fault; there is no degraded mode.

use std::{fmt, time::Duration};

use opentelemetry::{
    KeyValue,
    metrics::MeterProvider as _,
    trace::TracerProvider as _,
};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, logs::SdkLoggerProvider, metrics::SdkMeterProvider, trace::SdkTracerProvider,
};
use parking_lot::Mutex;
use tracing::{error, info};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, filter::Targets, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::context::Telemetry;
use crate::config::TelemetryConfig;

/// Instrumentation scope for the service's own tracer and meter
const SCOPE_NAME: &str = "todo_app";

/// One of the three exported telemetry signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traces => write!(f, "traces"),
            Self::Metrics => write!(f, "metrics"),
            Self::Logs => write!(f, "logs"),
        }
    }
}

/// Error type for telemetry initialization and shutdown
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to install the tracing subscriber
    #[error("Failed to initialize tracing: {0}")]
    Init(String),

    /// Failed to construct an exporter
    #[error("Failed to create {signal} exporter: {reason}")]
    Exporter { signal: Signal, reason: String },

    /// A provider failed to flush or close
    #[error("Failed to shut down {signal} provider: {reason}")]
    Shutdown { signal: Signal, reason: String },

    /// Shutdown did not finish within the grace period
    #[error("Telemetry shutdown exceeded grace period of {0:?}")]
    ShutdownTimeout(Duration),
}

/// The SDK providers for all three signals
#[derive(Debug)]
pub struct Providers {
    pub tracer: SdkTracerProvider,
    pub meter: SdkMeterProvider,
    pub logger: SdkLoggerProvider,
}

impl Providers {
    /// Flush and close traces, then metrics, then logs
    ///
    /// Every provider is attempted; the first failure is returned.
    fn shutdown(self) -> Result<(), TelemetryError> {
        let results = [
            (Signal::Traces, self.tracer.shutdown()),
            (Signal::Metrics, self.meter.shutdown()),
            (Signal::Logs, self.logger.shutdown()),
        ];

        let mut first = None;
        for (signal, result) in results {
            if let Err(e) = result {
                let err = TelemetryError::Shutdown {
                    signal,
                    reason: e.to_string(),
                };
                error!(error = %err, "Telemetry provider shutdown failed");
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// Handle owning the telemetry providers for the life of the process
///
/// `shutdown` may be called any number of times; only the first call does
/// work. Dropping a handle that was never shut down flushes best-effort.
pub struct TelemetryHandle {
    providers: Mutex<Option<Providers>>,
    grace: Duration,
}

impl fmt::Debug for TelemetryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryHandle")
            .field("active", &self.providers.lock().is_some())
            .field("grace", &self.grace)
            .finish()
    }
}

impl TelemetryHandle {
    /// Wrap already built providers
    pub fn new(providers: Providers, grace: Duration) -> Self {
        Self {
            providers: Mutex::new(Some(providers)),
            grace,
        }
    }

    /// Handle without providers; shutdown is a no-op
    pub fn disabled() -> Self {
        Self {
            providers: Mutex::new(None),
            grace: Duration::ZERO,
        }
    }

    /// Whether providers are still owned by this handle
    pub fn is_active(&self) -> bool {
        self.providers.lock().is_some()
    }

    /// Flush and close all providers within the grace period
    pub async fn shutdown(&self) -> Result<(), TelemetryError> {
        let Some(providers) = self.providers.lock().take() else {
            return Ok(());
        };

        let task = tokio::task::spawn_blocking(move || providers.shutdown());
        match tokio::time::timeout(self.grace, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(TelemetryError::Shutdown {
                signal: Signal::Traces,
                reason: join.to_string(),
            }),
            Err(_) => Err(TelemetryError::ShutdownTimeout(self.grace)),
        }
    }
}

impl Drop for TelemetryHandle {
    fn drop(&mut self) {
        if let Some(providers) = self.providers.get_mut().take() {
            // Run off the current thread so an async runtime worker is never blocked on export
            let joined = std::thread::spawn(move || providers.shutdown()).join();
            if let Ok(Err(e)) = joined {
                error!(error = %e, "Telemetry shutdown on drop failed");
            }
        }
    }
}

fn resource(config: &TelemetryConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attribute(KeyValue::new(
            "service.version",
            config.service_version.clone(),
        ))
        .build()
}

fn exporter_error(
    signal: Signal,
) -> impl FnOnce(opentelemetry_otlp::ExporterBuildError) -> TelemetryError {
    move |e| TelemetryError::Exporter {
        signal,
        reason: e.to_string(),
    }
}

fn tracer_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkTracerProvider, TelemetryError> {
    let builder = SdkTracerProvider::builder().with_resource(resource);
    let builder = match &config.otlp_endpoint {
        Some(endpoint) => builder.with_batch_exporter(
            opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(exporter_error(Signal::Traces))?,
        ),
        None => builder.with_batch_exporter(opentelemetry_stdout::SpanExporter::default()),
    };
    Ok(builder.build())
}

fn meter_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkMeterProvider, TelemetryError> {
    let builder = SdkMeterProvider::builder().with_resource(resource);
    let builder = match &config.otlp_endpoint {
        Some(endpoint) => builder.with_periodic_exporter(
            opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(exporter_error(Signal::Metrics))?,
        ),
        None => builder.with_periodic_exporter(opentelemetry_stdout::MetricExporter::default()),
    };
    Ok(builder.build())
}

fn logger_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkLoggerProvider, TelemetryError> {
    let builder = SdkLoggerProvider::builder().with_resource(resource);
    let builder = match &config.otlp_endpoint {
        Some(endpoint) => builder.with_batch_exporter(
            opentelemetry_otlp::LogExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(exporter_error(Signal::Logs))?,
        ),
        None => builder.with_batch_exporter(opentelemetry_stdout::LogExporter::default()),
    };
    Ok(builder.build())
}

/// Build the trace, metric and log providers without installing anything
pub fn build_providers(config: &TelemetryConfig) -> Result<Providers, TelemetryError> {
    let resource = resource(config);
    Ok(Providers {
        tracer: tracer_provider(config, resource.clone())?,
        meter: meter_provider(config, resource.clone())?,
        logger: logger_provider(config, resource)?,
    })
}

/// Exporter internals must not feed their own logs back into the log pipeline
fn log_bridge_filter() -> Targets {
    Targets::new()
        .with_default(LevelFilter::TRACE)
        .with_target("opentelemetry", LevelFilter::OFF)
        .with_target("hyper", LevelFilter::OFF)
        .with_target("h2", LevelFilter::OFF)
        .with_target("tonic", LevelFilter::OFF)
        .with_target("tower", LevelFilter::OFF)
        .with_target("reqwest", LevelFilter::OFF)
}

/// Initialize telemetry and install the global `tracing` subscriber
///
/// Returns the shutdown handle and the [`Telemetry`] context to hand to
/// every instrumented component. Must be called from within a Tokio runtime
/// when an OTLP endpoint is configured.
///
/// # Example
///
/// ```ignore
/// use infrastructure::{config::TelemetryConfig, telemetry::init_telemetry};
///
/// let (handle, telemetry) = init_telemetry(&TelemetryConfig::default())?;
/// // serve...
/// handle.shutdown().await?;
/// ```
pub fn init_telemetry(
    config: &TelemetryConfig,
) -> Result<(TelemetryHandle, Telemetry), TelemetryError> {
    let providers = build_providers(config)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let otel_layer = OpenTelemetryLayer::new(providers.tracer.tracer(SCOPE_NAME));
    let log_bridge =
        OpenTelemetryTracingBridge::new(&providers.logger).with_filter(log_bridge_filter());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .with(log_bridge)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    let telemetry = Telemetry::new(providers.meter.meter(SCOPE_NAME));

    info!(
        exporter = if config.uses_otlp() { "otlp" } else { "stdout" },
        endpoint = config.otlp_endpoint.as_deref().unwrap_or("-"),
        service = %config.service_name,
        "Telemetry initialized"
    );

    Ok((
        TelemetryHandle::new(providers, config.shutdown_grace()),
        telemetry,
    ))
}
