/*!
 * seqlog core: the delivery engine.
 *
 * Takes already-serialized CLEF records and POSTs them to a Seq server from
 * a pool of background threads. The producer is never blocked on the
 * network and never sees a delivery failure; problems are reported through
 * an optional fallback sink.
 *
 * Most applications depend on the `seqlog` facade, which plugs this crate
 * into `tracing`.
 *
 * # Module structure
 *
 * - `protocol/`: what we send: constants, endpoint config, error bodies
 * - `transport/`: how we deliver: HTTP, worker pool, shutdown barrier
 * - `dispatcher`: the `write` / `wait` entry points
 * - `fallback`: diagnostic sinks
 * - `guard`: RAII drain-on-drop
 */

mod dispatcher;
mod error;
mod fallback;
mod guard;
mod protocol;
mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use dispatcher::{Dispatcher, Options};
pub use error::Error;
pub use fallback::{ConsoleSink, FallbackSink};
pub use guard::DrainGuard;
pub use protocol::constants;
pub use protocol::endpoint::TransportConfig;
pub use protocol::response::extract_error_message;
pub use transport::{on_delivery_thread, OverflowPolicy};
