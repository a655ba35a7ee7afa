//! Telemetry export configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for traces, metrics and logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP/gRPC collector endpoint; console export when unset
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// `service.name` resource attribute
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// `service.version` resource attribute
    #[serde(default = "default_service_version")]
    pub service_version: String,

    /// Log level filter, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Upper bound for flushing all providers on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_service_name() -> String {
    "todo-app".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_log_filter() -> String {
    "info,tower_http=info,sqlx=warn".to_string()
}

const fn default_shutdown_grace() -> u64 {
    5
}

impl TelemetryConfig {
    /// Shutdown grace period
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Whether OTLP export is selected
    #[must_use]
    pub const fn uses_otlp(&self) -> bool {
        self.otlp_endpoint.is_some()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: default_service_name(),
            service_version: default_service_version(),
            log_filter: default_log_filter(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}
