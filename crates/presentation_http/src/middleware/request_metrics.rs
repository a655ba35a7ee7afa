//! Request count and duration metrics
//!
//! Installed with `Router::route_layer` so the matched route template is
//! known. Records exactly one count and one duration per request, whatever
//! the outcome.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    extract::{MatchedPath, Request},
    response::Response,
};
use infrastructure::telemetry::{RequestObservation, Telemetry};
use tower::{Layer, Service};

use super::request_span::record_route;

/// Layer that records per-request metrics
#[derive(Debug, Clone)]
pub struct RequestMetricsLayer {
    telemetry: Telemetry,
}

impl RequestMetricsLayer {
    pub const fn new(telemetry: Telemetry) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for RequestMetricsLayer {
    type Service = RequestMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestMetricsService {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

/// Service that times each request and records the outcome
#[derive(Debug, Clone)]
pub struct RequestMetricsService<S> {
    inner: S,
    telemetry: Telemetry,
}

impl<S> Service<Request> for RequestMetricsService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let start = Instant::now();
        let method = request.method().to_string();
        let endpoint = request.extensions().get::<MatchedPath>().map_or_else(
            || request.uri().path().to_owned(),
            |matched| matched.as_str().to_owned(),
        );
        record_route(&method, &endpoint);

        let telemetry = self.telemetry.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let result = inner.call(request).await;
            if let Ok(response) = &result {
                telemetry.request_metrics().record(&RequestObservation::new(
                    method,
                    endpoint,
                    response.status().as_u16(),
                    start.elapsed(),
                ));
            }
            result
        })
    }
}
