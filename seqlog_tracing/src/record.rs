/**
 * One CLEF line as sent to Seq.
 *
 * ```json
 * {"@t":"2024-01-15T10:30:00.123456789Z","@l":"info","@mt":"Info message",
 *  "caller":"src/main.rs:12","target":"app","user":"bob"}
 * ```
 *
 * Reified properties are renamed to the `@`-prefixed CLEF keys; everything
 * else is flattened alongside them.
 */
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use seqlog_core::constants::{CALLER_KEY, STACKTRACE_KEY, TARGET_KEY};
use serde_json::{Map, Value};
use tracing::Level;

#[derive(Serialize)]
pub struct ClefRecord<'a> {
    #[serde(rename = "@t")]
    pub timestamp: String,

    #[serde(rename = "@l")]
    pub level: &'static str,

    #[serde(rename = "@mt")]
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'a str>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ClefRecord<'_> {
    /**
     * Serializes the record as one newline-terminated line.
     *
     * Fields that collide with a populated reified property are dropped so
     * the object never carries duplicate keys.
     */
    pub fn to_line(mut self) -> serde_json::Result<Vec<u8>> {
        for (key, present) in [
            (CALLER_KEY, self.caller.is_some()),
            (STACKTRACE_KEY, self.trace.is_some()),
            (TARGET_KEY, self.target.is_some()),
        ] {
            if present {
                self.fields.remove(key);
            }
        }

        let mut line = serde_json::to_vec(&self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// RFC 3339 UTC timestamp with nanosecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Lowercase level name as understood by Seq.
pub fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warn",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        _ => "trace",
    }
}
