//! HTTP client that traces every outbound call
//!
//! Wraps `reqwest::Client` with two layers of instrumentation:
//!
//! - the caller's span receives `http.request.body` / `http.response.body`
//!   events and, if it declares them, the `http.method`, `http.url`,
//!   `http.host`, `http.status_code` and `http.status_text` fields
//! - each send runs in its own client span (`HTTP <METHOD>`) whose context
//!   is injected as a W3C `traceparent` header
//!
//! # Examples
//!
//! ```ignore
//! use infrastructure::http::InstrumentedHttpClient;
//!
//! let client = InstrumentedHttpClient::new()?;
//! let response = client.send(client.get("https://httpbin.org/get")).await?;
//! assert!(response.status().is_success());
//! ```

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Method, Request, RequestBuilder, Url};
use tracing::{Instrument, Span, debug, error, field::Empty, info, info_span};

use crate::telemetry::propagation;

/// Errors from an instrumented outbound call
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// Client or request could not be built
    #[error("Failed to build request: {0}")]
    Build(#[source] reqwest::Error),

    /// Connection, timeout or protocol failure before a response arrived
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Configuration for the instrumented HTTP client
#[derive(Debug, Clone)]
pub struct InstrumentedClientConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for InstrumentedClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("todo-app/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl InstrumentedClientConfig {
    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client producing spans and body events for business calls
#[derive(Debug, Clone)]
pub struct InstrumentedHttpClient {
    inner: Client,
    config: InstrumentedClientConfig,
}

impl InstrumentedHttpClient {
    /// Create a client with the default configuration
    pub fn new() -> Result<Self, HttpClientError> {
        Self::with_config(InstrumentedClientConfig::default())
    }

    /// Create a client with a custom configuration
    pub fn with_config(config: InstrumentedClientConfig) -> Result<Self, HttpClientError> {
        let inner = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(HttpClientError::Build)?;

        Ok(Self { inner, config })
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &InstrumentedClientConfig {
        &self.config
    }

    /// Start a GET request
    pub fn get(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.inner.get(url)
    }

    /// Start a POST request
    pub fn post(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.inner.post(url)
    }

    /// Start a request with a specific method
    pub fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.inner.request(method, url)
    }

    /// Build and execute `builder`
    pub async fn send(
        &self,
        builder: RequestBuilder,
    ) -> Result<http::Response<Bytes>, HttpClientError> {
        let request = builder.build().map_err(HttpClientError::Build)?;
        self.execute(request).await
    }

    /// Execute `request`, returning the fully buffered response
    ///
    /// No retries: a transport failure is recorded and returned as is.
    pub async fn execute(
        &self,
        mut request: Request,
    ) -> Result<http::Response<Bytes>, HttpClientError> {
        let caller = Span::current();
        let method = request.method().clone();
        let url = request.url().clone();
        let host = url.host_str().unwrap_or_default().to_owned();

        caller.record("http.method", method.as_str());
        caller.record("http.url", url.as_str());
        caller.record("http.host", host.as_str());

        if let Some(body) = request.body().and_then(reqwest::Body::as_bytes) {
            info!(
                body = %String::from_utf8_lossy(body),
                size = body.len(),
                "http.request.body"
            );
        }

        let client_span = client_span(&method, &url, &host);
        propagation::inject(&client_span, request.headers_mut());

        let response = match self
            .inner
            .execute(request)
            .instrument(client_span.clone())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                record_failure(&client_span, &caller, &e);
                return Err(HttpClientError::Transport(e));
            },
        };

        let status = response.status();
        client_span.record("http.response.status_code", status.as_u16());
        if status.is_client_error() || status.is_server_error() {
            client_span.record("otel.status_code", "ERROR");
        }

        let version = response.version();
        let headers = response.headers().clone();
        let body = match response.bytes().instrument(client_span.clone()).await {
            Ok(body) => body,
            Err(e) => {
                record_failure(&client_span, &caller, &e);
                return Err(HttpClientError::Body(e));
            },
        };

        info!(
            body = %String::from_utf8_lossy(&body),
            size = body.len(),
            status_code = status.as_u16(),
            "http.response.body"
        );
        caller.record("http.status_code", status.as_u16());
        caller.record("http.status_text", status.canonical_reason().unwrap_or_default());
        debug!(
            parent: &client_span,
            status = status.as_u16(),
            size = body.len(),
            "Response received"
        );

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

fn client_span(method: &Method, url: &Url, host: &str) -> Span {
    let name = format!("HTTP {method}");
    info_span!(
        "http.client.request",
        otel.name = name.as_str(),
        otel.kind = "client",
        http.request.method = %method,
        url.full = %url,
        server.address = host,
        http.response.status_code = Empty,
        otel.status_code = Empty,
    )
}

fn record_failure(client_span: &Span, caller: &Span, e: &reqwest::Error) {
    for span in [client_span, caller] {
        span.record("otel.status_code", "ERROR");
        error!(parent: span, error = %e, timeout = e.is_timeout(), "Outbound request failed");
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header_exists, method, path},
    };

    use super::*;
    use crate::telemetry::testing::SpanCapture;

    #[test]
    fn default_config() {
        let config = InstrumentedClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("todo-app/"));
    }

    #[test]
    fn config_builder() {
        let config = InstrumentedClientConfig::default()
            .with_timeout(Duration::from_secs(2))
            .with_user_agent("tester/1.0");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "tester/1.0");
    }

    #[tokio::test]
    async fn returns_status_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("x-echo", "yes")
                    .set_body_string("accepted"),
            )
            .mount(&server)
            .await;

        let client = InstrumentedHttpClient::new().unwrap();
        let response = client
            .send(client.get(format!("{}/get", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status(), 202);
        assert_eq!(response.headers()["x-echo"], "yes");
        assert_eq!(response.body().as_ref(), b"accepted");
    }

    #[tokio::test]
    async fn emits_body_events_on_caller_span() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .mount(&server)
            .await;

        let capture = SpanCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let caller = tracing::info_span!(
            "caller",
            http.method = Empty,
            http.host = Empty,
            http.status_code = Empty,
            http.status_text = Empty,
        );

        let client = InstrumentedHttpClient::new().unwrap();
        client
            .send(client.post(server.uri()).body("{\"title\":\"x\"}"))
            .instrument(caller)
            .await
            .unwrap();

        let caller = &capture.spans_named("caller")[0];
        assert_eq!(caller.field("http.method"), Some("POST"));
        assert_eq!(caller.field("http.host"), Some("127.0.0.1"));
        assert_eq!(caller.field("http.status_code"), Some("200"));
        assert_eq!(caller.field("http.status_text"), Some("OK"));

        let request = &capture.events_named("http.request.body")[0];
        assert_eq!(request.span, Some(caller.index));
        assert_eq!(request.field("body"), Some("{\"title\":\"x\"}"));
        assert_eq!(request.field("size"), Some("13"));

        let response = &capture.events_named("http.response.body")[0];
        assert_eq!(response.span, Some(caller.index));
        assert_eq!(response.field("status_code"), Some("200"));

        let client_span = &capture.spans_named("http.client.request")[0];
        assert_eq!(client_span.parent, Some(caller.index));
        assert_eq!(client_span.field("otel.name"), Some("HTTP POST"));
        assert_eq!(client_span.field("http.response.status_code"), Some("200"));
        assert!(client_span.closed);
    }

    #[tokio::test]
    async fn transport_failure_marks_both_spans() {
        let capture = SpanCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let caller = tracing::info_span!("caller", otel.status_code = Empty);

        let client = InstrumentedHttpClient::with_config(
            InstrumentedClientConfig::default().with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        // Port 9 (discard) is not listening on loopback in test environments
        let err = client
            .send(client.get("http://127.0.0.1:9/unreachable"))
            .instrument(caller)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpClientError::Transport(_)));

        assert_eq!(
            capture.spans_named("caller")[0].field("otel.status_code"),
            Some("ERROR")
        );
        assert_eq!(
            capture.spans_named("http.client.request")[0].field("otel.status_code"),
            Some("ERROR")
        );
        assert!(capture.events_named("http.response.body").is_empty());
    }

    #[tokio::test]
    async fn server_error_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = InstrumentedHttpClient::new().unwrap();
        let response = client.send(client.get(server.uri())).await.unwrap();
        assert_eq!(response.status(), 503);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn timeout_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = InstrumentedHttpClient::with_config(
            InstrumentedClientConfig::default().with_timeout(Duration::from_millis(100)),
        )
        .unwrap();
        let err = client.send(client.get(server.uri())).await.unwrap_err();
        match err {
            HttpClientError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_header_is_a_build_error() {
        let client = InstrumentedHttpClient::new().unwrap();
        let err = client
            .send(client.get("http://localhost/").header("x-bad", "line\nbreak"))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpClientError::Build(_)));
    }

    #[tokio::test]
    async fn user_agent_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = InstrumentedHttpClient::new().unwrap();
        let response = client.send(client.get(server.uri())).await.unwrap();
        assert_eq!(response.status(), 204);
    }
}
