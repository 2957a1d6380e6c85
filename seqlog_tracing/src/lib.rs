/*!
 * `tracing` integration for seqlog.
 *
 * `SeqLayer` turns each event into one CLEF line (`@t`, `@l`, `@mt`,
 * `caller`, `trace`, `target` and the event's fields) and queues it on a
 * `seqlog_core::Dispatcher`.
 *
 * ```no_run
 * use seqlog_core::Dispatcher;
 * use tracing_subscriber::prelude::*;
 *
 * let dispatcher = Dispatcher::new("http://localhost:5341", None)?;
 * let _guard = dispatcher.guard();
 *
 * tracing_subscriber::registry()
 *     .with(seqlog_tracing::SeqLayer::new(dispatcher))
 *     .init();
 *
 * tracing::info!(user = "bob", "Signed in");
 * # Ok::<(), seqlog_core::Error>(())
 * ```
 */

mod layer;
mod record;
mod stacktrace;
mod visitor;

pub use layer::SeqLayer;
