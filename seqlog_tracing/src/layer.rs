/**
 * `tracing` layer encoding events as CLEF and handing them to a
 * `Dispatcher`.
 *
 * Span fields are stored in the span's extensions when the span is created
 * and merged into every event inside it, outermost span first.
 */
use serde_json::{Map, Value};
use seqlog_core::{on_delivery_thread, Dispatcher};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::record::{level_name, timestamp_now, ClefRecord};
use crate::stacktrace;
use crate::visitor::JsonVisitor;

/// Fields recorded on a span, kept in its extensions.
struct SpanFields(Map<String, Value>);

pub struct SeqLayer {
    dispatcher: Dispatcher,
    caller: bool,
    target: bool,
    stacktrace: Option<Level>,
}

impl SeqLayer {
    /// Caller and target on, stack traces for `ERROR` events.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            caller: true,
            target: true,
            stacktrace: Some(Level::ERROR),
        }
    }

    pub fn with_caller(mut self, enabled: bool) -> Self {
        self.caller = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.target = enabled;
        self
    }

    /**
     * Attaches a `trace` property to events at `level` or more severe.
     * `None` disables stack traces.
     */
    pub fn with_stacktrace(mut self, level: Option<Level>) -> Self {
        self.stacktrace = level;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn wants_stacktrace(&self, level: &Level) -> bool {
        // `Level` orders ERROR as the smallest value.
        self.stacktrace.is_some_and(|threshold| *level <= threshold)
    }

    fn encode(
        &self,
        metadata: &'static Metadata<'static>,
        fields: Map<String, Value>,
        message: String,
    ) -> ClefRecord<'static> {
        let level = metadata.level();

        ClefRecord {
            timestamp: timestamp_now(),
            level: level_name(level),
            message,
            caller: if self.caller { caller(metadata) } else { None },
            trace: if self.wants_stacktrace(level) { stacktrace::capture() } else { None },
            target: if self.target { Some(metadata.target()) } else { None },
            fields,
        }
    }

    fn ship(&self, record: ClefRecord<'_>) {
        let line = match record.to_line() {
            Ok(line) => line,
            Err(e) => {
                self.report("Failed encoding record for Seq", e.to_string());
                return;
            }
        };

        if let Err(e) = self.dispatcher.write(&line) {
            self.report("Failed to queue record for Seq", e.to_string());
        }
    }

    fn report(&self, message: &str, error: String) {
        if let Some(sink) = self.dispatcher.fallback() {
            sink.report(Level::ERROR, message, &[("error", error)]);
        }
    }
}

fn caller(metadata: &Metadata<'_>) -> Option<String> {
    match (metadata.file(), metadata.line()) {
        (Some(file), Some(line)) => Some(format!("{file}:{line}")),
        (Some(file), None) => Some(file.to_string()),
        _ => None,
    }
}

impl<S> Layer<S> for SeqLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut visitor = JsonVisitor::new();
        attrs.record(&mut visitor);
        let (fields, _) = visitor.into_parts();

        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut extensions = span.extensions_mut();
        let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() else {
            return;
        };

        let mut visitor = JsonVisitor::with_fields(std::mem::take(fields));
        values.record(&mut visitor);
        *fields = visitor.into_parts().0;
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if on_delivery_thread() {
            return;
        }

        let mut merged = Map::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanFields(fields)) = span.extensions().get::<SpanFields>() {
                    merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }

        let mut visitor = JsonVisitor::with_fields(merged);
        event.record(&mut visitor);
        let (fields, message) = visitor.into_parts();

        let record = self.encode(event.metadata(), fields, message.unwrap_or_default());
        self.ship(record);
    }
}
