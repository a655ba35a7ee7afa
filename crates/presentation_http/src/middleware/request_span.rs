//! Server span for every inbound request
//!
//! Plugged into `tower_http::trace::TraceLayer`: continues an incoming W3C
//! trace, names the span after method and path, and records the final status.

use std::time::Duration;

use axum::http::{Request, Response};
use infrastructure::telemetry::propagation;
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::{Span, debug, field::Empty, info_span};

/// `MakeSpan` + `OnResponse` pair producing `http.server.request` spans
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerSpan;

impl<B> MakeSpan<B> for ServerSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let method = request.method();
        let path = request.uri().path();
        let name = format!("{method} {path}");
        let user_agent = request
            .headers()
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let span = info_span!(
            "http.server.request",
            otel.name = name.as_str(),
            otel.kind = "server",
            http.request.method = %method,
            url.path = path,
            user_agent.original = user_agent,
            http.route = Empty,
            http.response.status_code = Empty,
            otel.status_code = Empty,
        );
        propagation::continue_remote_trace(&span, request.headers());
        span
    }
}

impl<B> OnResponse<B> for ServerSpan {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("http.response.status_code", status.as_u16());
        if status.is_server_error() {
            span.record("otel.status_code", "ERROR");
        }
        debug!(
            parent: span,
            status = status.as_u16(),
            latency_ms = latency.as_secs_f64() * 1000.0,
            "Response sent"
        );
    }
}

/// Attach the matched route template to the current server span
pub fn record_route(method: &str, route: &str) {
    let span = Span::current();
    span.record("http.route", route);
    span.record("otel.name", format!("{method} {route}").as_str());
}
