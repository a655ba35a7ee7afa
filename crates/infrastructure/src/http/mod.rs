//! Outbound HTTP with trace propagation and body capture

mod instrumented_client;

pub use instrumented_client::{HttpClientError, InstrumentedClientConfig, InstrumentedHttpClient};
