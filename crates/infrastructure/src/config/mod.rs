//! Application configuration
//!
//! Layered from compiled-in defaults, an optional `config.toml`, and
//! environment variables prefixed with `TODO_APP__` (double underscore
//! between nested keys, e.g. `TODO_APP__SERVER__PORT=9000`). The standard
//! `OTEL_EXPORTER_OTLP_ENDPOINT` variable wins over `telemetry.otlp_endpoint`.

mod database;
mod notifier;
mod server;
mod telemetry;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use database::DatabaseConfig;
pub use notifier::NotifierConfig;
pub use server::ServerConfig;
pub use telemetry::TelemetryConfig;

/// Environment variable selecting OTLP export
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Task store settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Trace, metric and log export
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Outbound task-created notification
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration using `file` as the optional config file stem or path
    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.host", server::DEFAULT_HOST)?
            .set_default("server.port", i64::from(server::DEFAULT_PORT))?
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("TODO_APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply_otlp_override(std::env::var(OTLP_ENDPOINT_ENV).ok());
        Ok(config)
    }

    /// Let a non-empty `OTEL_EXPORTER_OTLP_ENDPOINT` value replace the configured endpoint
    pub fn apply_otlp_override(&mut self, endpoint: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            debug!(endpoint = %endpoint, "OTLP endpoint taken from environment");
            self.telemetry.otlp_endpoint = Some(endpoint);
        }
    }
}
