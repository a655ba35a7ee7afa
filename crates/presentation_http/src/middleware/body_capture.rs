//! Request/response body capture
//!
//! Records the request body as an `http.request.body` event before the
//! handler runs and mirrors the response body into an `http.response.body`
//! event as it streams out. Both events land on the span that is current
//! when the service is called, so this layer belongs inside the server span.
//! Bytes, headers and status pass through untouched.
//!
//! Request bodies are buffered only up to a limit, by default axum's
//! `DefaultBodyLimit`. A larger body reaches the handler unread and no
//! event is emitted for it.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{Method, StatusCode},
    response::Response,
};
use http_body::{Frame, SizeHint};
use tower::{Layer, Service};
use tracing::{Span, debug, info, warn};

/// Whether requests with this method conventionally carry a body
fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::DELETE)
}

/// Largest request body that is buffered and recorded (axum's default body limit)
pub const REQUEST_CAPTURE_LIMIT: usize = 2 * 1024 * 1024;

/// Layer that captures request and response bodies as span events
#[derive(Debug, Clone, Copy)]
pub struct BodyCaptureLayer {
    limit: usize,
}

impl BodyCaptureLayer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: REQUEST_CAPTURE_LIMIT,
        }
    }

    /// Buffer at most `limit` request bytes
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for BodyCaptureLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for BodyCaptureLayer {
    type Service = BodyCaptureService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BodyCaptureService {
            inner,
            limit: self.limit,
        }
    }
}

/// Service that buffers the request body and mirrors the response body
#[derive(Debug, Clone)]
pub struct BodyCaptureService<S> {
    inner: S,
    limit: usize,
}

impl<S> Service<Request> for BodyCaptureService<S>
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
        let span = Span::current();
        // The clone may not be ready; swap so the ready service handles this request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limit = self.limit;

        Box::pin(async move {
            let request = if carries_body(request.method()) {
                capture_request(request, limit).await
            } else {
                request
            };

            let response = inner.call(request).await?;
            let status = response.status();
            Ok(response.map(|body| Body::new(MirroredBody::new(body, status, span))))
        })
    }
}

/// Read the request body, record it, and hand back an unread copy
///
/// Bodies above `limit` are passed on unread (already consumed bytes are
/// replayed first) without an event. Trailers are not carried over.
async fn capture_request(request: Request, limit: usize) -> Request {
    let (parts, mut body) = request.into_parts();
    let declared = http_body::Body::size_hint(&body).lower();
    if usize::try_from(declared).map_or(true, |declared| declared > limit) {
        debug!(size = declared, limit, "Request body too large to capture");
        return Request::from_parts(parts, body);
    }

    let mut buffer = Vec::new();
    loop {
        let frame =
            std::future::poll_fn(|cx| http_body::Body::poll_frame(Pin::new(&mut body), cx)).await;
        match frame {
            Some(Ok(frame)) => {
                let Ok(data) = frame.into_data() else {
                    continue;
                };
                buffer.extend_from_slice(&data);
                if buffer.len() > limit {
                    debug!(limit, "Request body too large to capture");
                    let replay = ReplayBody {
                        prefix: Some(Bytes::from(buffer)),
                        rest: body,
                    };
                    return Request::from_parts(parts, Body::new(replay));
                }
            },
            Some(Err(e)) => {
                warn!(error = %e, "Failed to read request body");
                return Request::from_parts(parts, Body::empty());
            },
            None => break,
        }
    }

    info!(
        body = %String::from_utf8_lossy(&buffer),
        size = buffer.len(),
        "http.request.body"
    );
    Request::from_parts(parts, Body::from(buffer))
}

/// Bytes already read from a request body followed by the unread remainder
struct ReplayBody {
    prefix: Option<Bytes>,
    rest: Body,
}

impl http_body::Body for ReplayBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if let Some(prefix) = self.prefix.take() {
            return Poll::Ready(Some(Ok(Frame::data(prefix))));
        }
        http_body::Body::poll_frame(Pin::new(&mut self.rest), cx)
    }

    fn is_end_stream(&self) -> bool {
        self.prefix.is_none() && http_body::Body::is_end_stream(&self.rest)
    }
}

/// Response body decorator that copies every data frame it forwards
///
/// The copy is emitted once, when the stream ends or the body is dropped,
/// whichever comes first. Nothing is emitted for an empty body.
pub struct MirroredBody {
    inner: Body,
    buffer: Vec<u8>,
    status: StatusCode,
    span: Span,
    emitted: bool,
}

impl std::fmt::Debug for MirroredBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirroredBody")
            .field("buffered", &self.buffer.len())
            .field("status", &self.status)
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

impl MirroredBody {
    pub fn new(inner: Body, status: StatusCode, span: Span) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            status,
            span,
            emitted: false,
        }
    }

    fn emit(&mut self) {
        if self.emitted || self.buffer.is_empty() {
            return;
        }
        self.emitted = true;
        info!(
            parent: &self.span,
            body = %String::from_utf8_lossy(&self.buffer),
            size = self.buffer.len(),
            status_code = self.status.as_u16(),
            "http.response.body"
        );
    }
}

impl http_body::Body for MirroredBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        match http_body::Body::poll_frame(Pin::new(&mut this.inner), cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.buffer.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            },
            Poll::Ready(None) => {
                this.emit();
                Poll::Ready(None)
            },
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        http_body::Body::is_end_stream(&self.inner)
    }

    fn size_hint(&self) -> SizeHint {
        http_body::Body::size_hint(&self.inner)
    }
}

impl Drop for MirroredBody {
    fn drop(&mut self) {
        self.emit();
    }
}
