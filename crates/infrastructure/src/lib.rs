//! Infrastructure layer - Adapters for external systems
//!
//! Implements the application ports (SQLite task store, HTTP notifier) and
//! owns configuration and the telemetry pipelines.

pub mod adapters;
pub mod config;
pub mod http;
pub mod persistence;
pub mod telemetry;

pub use adapters::HttpTaskNotifier;
pub use config::{AppConfig, DatabaseConfig, NotifierConfig, ServerConfig, TelemetryConfig};
pub use http::{HttpClientError, InstrumentedClientConfig, InstrumentedHttpClient};
pub use persistence::{AsyncDatabase, DatabaseError, SqliteTaskStore};
pub use telemetry::{Telemetry, TelemetryError, TelemetryHandle, init_telemetry};
