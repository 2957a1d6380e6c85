/**
 * Fallback reporting: the only place delivery problems become visible.
 *
 * A `FallbackSink` receives a level, a message and a list of key/value
 * fields. The dispatcher only ever reports at `Level::ERROR`. When no sink is
 * installed, diagnostics are dropped: failures are opt-in observable.
 *
 * Diagnostics must not be written through the application's `tracing`
 * subscriber. That subscriber usually contains the Seq layer itself, and a
 * failing Seq would then feed its own failures back into the queue. Sinks
 * may also be called from inside a subscriber callback, where `tracing`
 * drops nested events. `ConsoleSink` therefore writes to stderr directly.
 */
use std::io::Write as _;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::Level;

/**
 * Secondary channel for transmission diagnostics.
 *
 * Implementations are called from delivery worker threads (and from the
 * producer when a record cannot be queued) and must not block for long.
 */
pub trait FallbackSink: Send + Sync {
    fn report(&self, level: Level, message: &str, fields: &[(&str, String)]);
}

// ---------------------------------------------------------------------------
// ConsoleSink
// ---------------------------------------------------------------------------

/**
 * Writes diagnostics to stderr, one line each:
 *
 * ```text
 * [seqlog] ERROR Seq error error-message="bad format" content-type="application/json"
 * ```
 */
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl FallbackSink for ConsoleSink {
    fn report(&self, level: Level, message: &str, fields: &[(&str, String)]) {
        let line = render_line(level, message, fields);
        // Nowhere left to report a failing stderr.
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }
}

fn render_line(level: Level, message: &str, fields: &[(&str, String)]) -> String {
    let mut line = format!("[seqlog] {level} {message}");
    if !fields.is_empty() {
        line.push(' ');
        line.push_str(&render_fields(fields));
    }
    line
}

fn render_fields(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value:?}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// FallbackSlot
// ---------------------------------------------------------------------------

/**
 * Swappable holder for the current sink.
 *
 * Readers clone the `Arc` out under a short read lock, so a sink can be
 * installed or removed while workers are reporting.
 */
#[derive(Default)]
pub struct FallbackSlot {
    sink: RwLock<Option<Arc<dyn FallbackSink>>>,
}

impl FallbackSlot {
    pub fn new(sink: Option<Arc<dyn FallbackSink>>) -> Self {
        Self {
            sink: RwLock::new(sink),
        }
    }

    pub fn set(&self, sink: Option<Arc<dyn FallbackSink>>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    pub fn current(&self) -> Option<Arc<dyn FallbackSink>> {
        self.sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reports at error level if a sink is installed, otherwise does nothing.
    pub fn error(&self, message: &str, fields: &[(&str, String)]) {
        if let Some(sink) = self.current() {
            sink.report(Level::ERROR, message, fields);
        }
    }
}
