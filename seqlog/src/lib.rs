/**
 * seqlog: ship `tracing` events to a Seq server.
 *
 * This is the crate applications should depend on. It re-exports the core
 * delivery engine and the `tracing` layer, and wires both into the global
 * subscriber through a single `init` call.
 *
 * # Quick start
 *
 * ```no_run
 * fn main() -> Result<(), seqlog::InitError> {
 *     let _guard = seqlog::init("http://localhost:5341/")?;
 *
 *     tracing::info!(user = "bob", "Signed in");
 *
 *     // _guard is dropped here → pending records are delivered first
 *     Ok(())
 * }
 * ```
 *
 * # With options
 *
 * ```no_run
 * use tracing::level_filters::LevelFilter;
 *
 * let _guard = seqlog::init(seqlog::Options {
 *     endpoint: "http://localhost:5341/".into(),
 *     api_key: Some("YOUR_API_KEY".into()),
 *     console: true,
 *     max_level: LevelFilter::DEBUG,
 *     ..Default::default()
 * })?;
 * # Ok::<(), seqlog::InitError>(())
 * ```
 */

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::prelude::*;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use seqlog_core::{
    constants, extract_error_message, ConsoleSink, Dispatcher, DrainGuard, Error, FallbackSink,
    OverflowPolicy, TransportConfig,
};
pub use seqlog_core::Options as DispatcherOptions;
pub use seqlog_tracing::SeqLayer;

/// Returned by `init`; dropping it waits for every queued record.
pub type Guard = DrainGuard;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/**
 * Configuration for `init`.
 *
 * Implements `From<&str>` so you can pass just the server URL.
 * Defaults:
 * - `fallback_logs` = `false` (delivery failures are silently dropped)
 * - `console` = `false`
 * - `max_level` = `LevelFilter::INFO`
 */
#[derive(Clone)]
pub struct Options {
    /// Base URL of the Seq server, e.g. `http://localhost:5341/`.
    pub endpoint: String,

    /// Sent as `X-Seq-ApiKey` when set and non-empty.
    pub api_key: Option<String>,

    /// Report delivery failures to stderr. Off unless asked for.
    pub fallback_logs: bool,

    /// Also print every event to stdout.
    pub console: bool,

    /// Most verbose level that is recorded.
    pub max_level: LevelFilter,

    /// Worker pool, queue and timeout settings.
    pub dispatcher: DispatcherOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            fallback_logs: false,
            console: false,
            max_level: LevelFilter::INFO,
            dispatcher: DispatcherOptions::default(),
        }
    }
}

impl From<&str> for Options {
    fn from(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Dispatcher(#[from] Error),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized(#[from] SetGlobalDefaultError),
}

/**
 * Installs a global `tracing` subscriber that ships every event to Seq.
 *
 * Accepts either a bare endpoint or a full `Options` struct.
 *
 * Keep the returned `Guard` alive for the duration of the app; when it
 * drops, `init` waits for all pending records to be delivered.
 */
pub fn init(options: impl Into<Options>) -> Result<Guard, InitError> {
    let opts = options.into();

    let dispatcher =
        Dispatcher::with_options(&opts.endpoint, opts.api_key.as_deref(), opts.dispatcher)?;
    if opts.fallback_logs {
        dispatcher.enable_fallback_logs();
    }

    let console = opts
        .console
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    let subscriber = tracing_subscriber::registry()
        .with(opts.max_level)
        .with(layer(&dispatcher))
        .with(console);

    /*
     * `set_global_default` rather than `SubscriberInitExt::init`: the latter
     * also forwards `log` records, and the HTTP client logs through `log`.
     */
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(dispatcher.guard())
}

/// A `SeqLayer` with default settings for callers composing their own
/// subscriber.
pub fn layer(dispatcher: &Dispatcher) -> SeqLayer {
    SeqLayer::new(dispatcher.clone())
}
