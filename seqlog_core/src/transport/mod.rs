/**
 * Transport layer: how records reach Seq.
 *
 * - `http`: request construction and the ureq agent wrapper
 * - `worker`: bounded queue, worker threads, per-record state machine
 * - `barrier`: in-flight accounting behind `Dispatcher::wait`
 */

pub mod barrier;
pub mod http;
pub mod worker;

pub use barrier::ShutdownBarrier;
pub use http::Transport;
pub use worker::{on_delivery_thread, OverflowPolicy, PendingTransmission, Rejected, WorkerPool};
