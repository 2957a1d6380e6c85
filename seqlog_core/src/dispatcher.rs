/**
 * Accepts serialized records and ships them to Seq in the background.
 *
 * Lifecycle:
 * 1. The application builds a `Dispatcher` once at startup. This validates
 *    the endpoint, creates the bounded queue and spawns the worker pool.
 * 2. The logging pipeline calls `write` once per record, from any thread.
 *    `write` builds the HTTP request, registers it with the shutdown
 *    barrier, queues it and returns the payload length. It never waits for
 *    the network and never reports delivery failures.
 * 3. Before exit the application calls `wait` (or drops a `DrainGuard`) so
 *    queued and in-flight records are not abandoned.
 *
 * `Dispatcher` is a cheap `Clone` handle. Workers stop once the last handle
 * has been dropped and the queue is empty.
 */
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::Error;
use crate::fallback::{ConsoleSink, FallbackSink, FallbackSlot};
use crate::guard::DrainGuard;
use crate::protocol::endpoint::TransportConfig;
use crate::transport::http::build_request;
use crate::transport::worker::submit;
use crate::transport::{
    OverflowPolicy, PendingTransmission, Rejected, ShutdownBarrier, Transport, WorkerPool,
};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/**
 * Tuning knobs for the delivery pipeline.
 *
 * # Example
 * ```ignore
 * let dispatcher = seqlog_core::Dispatcher::with_options(
 *     "http://localhost:5341",
 *     None,
 *     seqlog_core::Options {
 *         workers: 8,
 *         overflow: seqlog_core::OverflowPolicy::Block,
 *         ..Default::default()
 *     },
 * )?;
 * ```
 */
#[derive(Clone)]
pub struct Options {
    /// Number of delivery threads. Values below 1 are treated as 1.
    pub workers: usize,

    /// Records that may wait in the queue before the overflow policy applies.
    /// Values below 1 are treated as 1.
    pub queue_capacity: usize,

    /// What `write` does when the queue is full.
    pub overflow: OverflowPolicy,

    /// TCP connect timeout for each request. `None` disables it.
    pub connect_timeout: Option<Duration>,

    /// Overall timeout for each request, body included. `None` disables it.
    pub request_timeout: Option<Duration>,

    /// Sink installed from the start. Can be changed later with
    /// `set_fallback` / `enable_fallback_logs` / `disable_fallback_logs`.
    pub fallback: Option<Arc<dyn FallbackSink>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            overflow: OverflowPolicy::Drop,
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: Some(Duration::from_secs(30)),
            fallback: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: TransportConfig,
    sender: Sender<PendingTransmission>,
    barrier: Arc<ShutdownBarrier>,
    fallback: Arc<FallbackSlot>,
    overflow: OverflowPolicy,
    queue_capacity: usize,
}

impl Dispatcher {
    /**
     * Creates a dispatcher with default `Options`.
     *
     * # Arguments
     * * `endpoint`: Seq server URL, e.g. `http://localhost:5341/`.
     * * `api_key`: Optional Seq API key; empty means none.
     */
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self, Error> {
        Self::with_options(endpoint, api_key, Options::default())
    }

    /**
     * Creates a dispatcher and starts its worker pool.
     *
     * # Returns
     * * `Err(Error::EmptyEndpoint)` if `endpoint` is empty.
     * * `Err(Error::WorkerSpawn)` if a worker thread could not be started.
     */
    pub fn with_options(endpoint: &str, api_key: Option<&str>, options: Options) -> Result<Self, Error> {
        let config = TransportConfig::new(endpoint, api_key)?;

        let queue_capacity = options.queue_capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(queue_capacity);

        let fallback = Arc::new(FallbackSlot::new(options.fallback));
        let transport = Transport::new(options.connect_timeout, options.request_timeout);
        WorkerPool::spawn(options.workers, receiver, transport, Arc::clone(&fallback))?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                sender,
                barrier: Arc::new(ShutdownBarrier::new()),
                fallback,
                overflow: options.overflow,
                queue_capacity,
            }),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    // -----------------------------------------------------------------------
    // Fallback reporting
    // -----------------------------------------------------------------------

    /// Sends delivery diagnostics to stderr.
    pub fn enable_fallback_logs(&self) {
        self.set_fallback(Arc::new(ConsoleSink::new()));
    }

    /// Stops reporting delivery diagnostics. Failures are silently dropped.
    pub fn disable_fallback_logs(&self) {
        self.inner.fallback.set(None);
    }

    /// Installs a custom sink for delivery diagnostics.
    pub fn set_fallback(&self, sink: Arc<dyn FallbackSink>) {
        self.inner.fallback.set(Some(sink));
    }

    pub fn fallback(&self) -> Option<Arc<dyn FallbackSink>> {
        self.inner.fallback.current()
    }

    // -----------------------------------------------------------------------
    // Write / drain
    // -----------------------------------------------------------------------

    /**
     * Queues one serialized record for delivery.
     *
     * The payload is copied, so the caller may reuse its buffer as soon as
     * this returns.
     *
     * # Returns
     * * `Ok(record.len())` whenever the request could be built, including
     *   when the record is later lost or rejected.
     * * `Err(Error::RequestConstruction)` if the configured URL or API key
     *   cannot form a valid HTTP request. Nothing is queued in that case.
     */
    pub fn write(&self, record: &[u8]) -> Result<usize, Error> {
        let request = build_request(&self.inner.config, record.to_vec())?;

        let pending = PendingTransmission {
            request,
            in_flight: self.inner.barrier.enter(),
        };

        match submit(&self.inner.sender, pending, self.inner.overflow) {
            Ok(()) => {}
            Err(Rejected::Full) => self.inner.fallback.error(
                "Seq queue is full, dropping record",
                &[("queue-capacity", self.inner.queue_capacity.to_string())],
            ),
            Err(Rejected::Disconnected) => self
                .inner
                .fallback
                .error("Seq delivery workers have stopped, dropping record", &[]),
        }

        Ok(record.len())
    }

    /// Blocks until every record accepted so far has been processed.
    pub fn wait(&self) {
        self.inner.barrier.wait();
    }

    /**
     * Bounded `wait`.
     *
     * # Returns
     * `true` if everything drained within `timeout`.
     */
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.inner.barrier.wait_timeout(timeout)
    }

    /// Records queued or being sent right now.
    pub fn in_flight(&self) -> usize {
        self.inner.barrier.in_flight()
    }

    /// Returns a guard that calls `wait` when dropped.
    pub fn guard(&self) -> DrainGuard {
        DrainGuard::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// io::Write / MakeWriter
// ---------------------------------------------------------------------------

/*
 * Each `write` call is one record. Callers must hand over a complete CLEF
 * line per call (`write_all` with a prepared buffer); `write!` would split
 * a line into several records.
 */
impl io::Write for &Dispatcher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Dispatcher::write(*self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Dispatcher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Dispatcher::write(&*self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/**
 * Lets any `tracing_subscriber::fmt` layer write straight into Seq, e.g.
 * `fmt::layer().json().with_writer(dispatcher.clone())`. The fmt layer
 * formats each event into one buffer and writes it in a single call.
 */
impl<'a> MakeWriter<'a> for Dispatcher {
    type Writer = &'a Dispatcher;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_empty_endpoint_fails() {
        let result = Dispatcher::new("", None);
        assert!(matches!(result, Err(Error::EmptyEndpoint)));
    }

    #[test]
    fn test_config_is_exposed() {
        let dispatcher = Dispatcher::new("http://localhost:5341/", Some("")).unwrap();
        assert_eq!(dispatcher.config().url(), "http://localhost:5341/api/events/raw");
        assert_eq!(dispatcher.config().api_key(), None);
    }

    #[test]
    fn test_invalid_url_fails_write_without_queueing() {
        let dispatcher = Dispatcher::new("http://bad host/", None).unwrap();

        let result = dispatcher.write(b"{\"@mt\":\"hello\"}\n");
        assert!(matches!(result, Err(Error::RequestConstruction(_))));
        assert_eq!(dispatcher.in_flight(), 0);

        let io_result = (&dispatcher).write_all(b"{}\n");
        assert!(io_result.is_err());
    }

    #[test]
    fn test_toggle_fallback_logs() {
        let dispatcher = Dispatcher::new("http://localhost:5341", None).unwrap();
        assert!(dispatcher.fallback().is_none());

        dispatcher.enable_fallback_logs();
        assert!(dispatcher.fallback().is_some());

        dispatcher.disable_fallback_logs();
        assert!(dispatcher.fallback().is_none());
    }
}
