//! W3C trace-context propagation over `http` headers

use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::{
    Context,
    propagation::{Extractor, Injector, TextMapPropagator},
    trace::TraceContextExt,
};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header carrying the W3C trace parent
pub const TRACEPARENT: &str = "traceparent";

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Write `span`'s trace context into `headers`
///
/// Nothing is written when the span is not exported through OpenTelemetry.
pub fn inject(span: &Span, headers: &mut HeaderMap) {
    let cx = span.context();
    if cx.span().span_context().is_valid() {
        TraceContextPropagator::new().inject_context(&cx, &mut HeaderInjector(headers));
    }
}

/// The W3C `traceparent` value for `span`, if it is exported
pub fn traceparent(span: &Span) -> Option<String> {
    let mut headers = HeaderMap::new();
    inject(span, &mut headers);
    headers
        .get(TRACEPARENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Read a remote trace context from `headers`
pub fn extract(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

/// Continue the trace described by `headers`, if any, in `span`
pub fn continue_remote_trace(span: &Span, headers: &HeaderMap) {
    let cx = extract(headers);
    if cx.span().span_context().is_valid() {
        let _ = span.set_parent(cx);
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::trace::{TraceId, TracerProvider as _};
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    const REMOTE: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn otel_subscriber() -> impl tracing::Subscriber + Send + Sync {
        let provider = SdkTracerProvider::builder().build();
        tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")))
    }

    #[test]
    fn extracts_remote_parent() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT, HeaderValue::from_static(REMOTE));

        let cx = extract(&headers);
        let span_context = cx.span().span_context().clone();
        assert!(span_context.is_remote());
        assert_eq!(
            span_context.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
    }

    #[test]
    fn missing_header_yields_invalid_context() {
        let cx = extract(&HeaderMap::new());
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn injects_traceparent_for_exported_span() {
        let _guard = tracing::subscriber::set_default(otel_subscriber());
        let span = tracing::info_span!("outbound");

        let mut headers = HeaderMap::new();
        inject(&span, &mut headers);

        let value = headers.get(TRACEPARENT).unwrap().to_str().unwrap();
        let parts: Vec<_> = value.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "00");
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), 16);
    }

    #[test]
    fn continued_span_keeps_remote_trace_id() {
        let _guard = tracing::subscriber::set_default(otel_subscriber());
        let mut incoming = HeaderMap::new();
        incoming.insert(TRACEPARENT, HeaderValue::from_static(REMOTE));

        let span = tracing::info_span!("server");
        continue_remote_trace(&span, &incoming);

        let mut outgoing = HeaderMap::new();
        inject(&span, &mut outgoing);
        let value = outgoing.get(TRACEPARENT).unwrap().to_str().unwrap();
        assert!(value.contains("4bf92f3577b34da6a3ce929d0e0e4736"));
    }

    #[test]
    fn inject_without_otel_layer_writes_nothing() {
        let span = tracing::info_span!("plain");
        let mut headers = HeaderMap::new();
        inject(&span, &mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn traceparent_follows_exported_span() {
        let _guard = tracing::subscriber::set_default(otel_subscriber());
        let mut incoming = HeaderMap::new();
        incoming.insert(TRACEPARENT, HeaderValue::from_static(REMOTE));
        let span = tracing::info_span!("db");
        continue_remote_trace(&span, &incoming);

        let value = traceparent(&span).unwrap();
        assert!(value.starts_with("00-4bf92f3577b34da6a3ce929d0e0e4736-"));
    }

    #[test]
    fn traceparent_absent_without_otel_layer() {
        assert!(traceparent(&tracing::info_span!("plain")).is_none());
    }
}
