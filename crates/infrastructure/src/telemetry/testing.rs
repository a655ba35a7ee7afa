//! In-memory span and event capture for tests
//!
//! Install [`SpanCapture::subscriber`] with `tracing::subscriber::set_default`
//! on a current-thread runtime, exercise the code, then inspect the spans
//! and events it produced.

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
    span::{Attributes, Id, Record},
};
use tracing_subscriber::{Layer, layer::Context, layer::SubscriberExt, registry::LookupSpan};

/// A recorded span
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    /// Position in capture order; stable even when the subscriber reuses ids
    pub index: usize,
    pub name: &'static str,
    pub fields: HashMap<String, String>,
    /// Capture index of the parent span
    pub parent: Option<usize>,
    pub closed: bool,
}

impl CapturedSpan {
    /// Field value rendered as text
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A recorded event
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    /// The event's message, used as its name when exported
    pub name: String,
    pub level: tracing::Level,
    pub fields: HashMap<String, String>,
    /// Capture index of the enclosing span
    pub span: Option<usize>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct CaptureState {
    spans: Vec<CapturedSpan>,
    live: HashMap<u64, usize>,
    events: Vec<CapturedEvent>,
}

/// `tracing` layer that records every span and event it sees
#[derive(Clone, Default)]
pub struct SpanCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl fmt::Debug for SpanCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SpanCapture")
            .field("spans", &state.spans.len())
            .field("events", &state.events.len())
            .finish()
    }
}

impl SpanCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with this capture layer attached
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry().with(self.clone())
    }

    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.state.lock().spans.clone()
    }

    pub fn spans_named(&self, name: &str) -> Vec<CapturedSpan> {
        self.state
            .lock()
            .spans
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.state.lock().events.clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<CapturedEvent> {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Events emitted inside the span with capture index `span`
    pub fn events_in(&self, span: usize) -> Vec<CapturedEvent> {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| e.span == Some(span))
            .cloned()
            .collect()
    }

    /// Whether `span` is `ancestor` or one of its descendants
    pub fn descends_from(&self, span: usize, ancestor: usize) -> bool {
        let state = self.state.lock();
        let mut current = Some(span);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = state.spans.get(index).and_then(|s| s.parent);
        }
        false
    }
}

#[derive(Default)]
struct FieldVisitor(HashMap<String, String>);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_owned(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_owned(), value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_owned(), value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_owned(), value.to_string());
    }
}

impl<S> Layer<S> for SpanCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        let parent_id = ctx
            .span(id)
            .and_then(|span| span.parent())
            .map(|parent| parent.id().into_u64());

        let mut state = self.state.lock();
        let parent = parent_id.and_then(|p| state.live.get(&p).copied());
        let index = state.spans.len();
        state.spans.push(CapturedSpan {
            index,
            name: attrs.metadata().name(),
            fields: visitor.0,
            parent,
            closed: false,
        });
        state.live.insert(id.into_u64(), index);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let mut state = self.state.lock();
        if let Some(index) = state.live.get(&id.into_u64()).copied() {
            state.spans[index].fields.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let name = visitor.0.remove("message").unwrap_or_default();
        let span_id = ctx.event_span(event).map(|span| span.id().into_u64());

        let mut state = self.state.lock();
        let span = span_id.and_then(|id| state.live.get(&id).copied());
        state.events.push(CapturedEvent {
            name,
            level: *event.metadata().level(),
            fields: visitor.0,
            span,
        });
    }

    fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
        let mut state = self.state.lock();
        if let Some(index) = state.live.remove(&id.into_u64()) {
            state.spans[index].closed = true;
        }
    }
}
