/**
 * Wire-level constants for the Seq raw ingestion API.
 */

/// Path appended to the configured server URL.
pub const RAW_EVENTS_PATH: &str = "/api/events/raw";

/// Media type of a newline-delimited CLEF payload.
pub const CLEF_CONTENT_TYPE: &str = "application/vnd.serilog.clef";

/// Header carrying the optional Seq API key.
pub const API_KEY_HEADER: &str = "X-Seq-ApiKey";

/// The only status Seq returns for an accepted payload (201 Created).
pub const ACCEPTED_STATUS: u16 = 201;

/// JSON field holding the server-side error message in a rejection body.
pub const ERROR_FIELD: &str = "Error";

// ---------------------------------------------------------------------------
// CLEF property names
// ---------------------------------------------------------------------------

pub const TIMESTAMP_KEY: &str = "@t";
pub const LEVEL_KEY: &str = "@l";
pub const MESSAGE_TEMPLATE_KEY: &str = "@mt";
pub const CALLER_KEY: &str = "caller";
pub const STACKTRACE_KEY: &str = "trace";
pub const TARGET_KEY: &str = "target";
