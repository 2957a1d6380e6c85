/**
 * Worker pool that drains the record queue and POSTs each record to Seq.
 *
 * Architecture overview:
 *
 * ```text
 *  ┌───────────────┐   bounded channel   ┌───────────────────┐
 *  │  Producers    │ ──────────────────► │  N worker threads │
 *  │  (any thread) │  PendingTransmission│  seqlog-worker-i  │
 *  └───────────────┘                     └─────────┬─────────┘
 *                                                  │
 *                                          Transport::send()
 *                                                  │
 *                                           ┌──────▼──────┐
 *                                           │     Seq     │
 *                                           └─────────────┘
 * ```
 *
 * Each queue entry carries its own `InFlight` token, so the shutdown
 * barrier is released when the entry is finished, discarded on overflow,
 * or dropped because the queue disconnected.
 *
 * Workers run until every `Sender` is gone (the last `Dispatcher` handle
 * was dropped) and the queue is empty.
 */
use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use ureq::http::header::CONTENT_TYPE;
use ureq::http::{Request, Response};
use ureq::Body;

use super::barrier::InFlight;
use super::http::Transport;
use crate::error::Error;
use crate::fallback::{FallbackSink, FallbackSlot};
use crate::protocol::constants::ACCEPTED_STATUS;
use crate::protocol::response::extract_error_message;

thread_local! {
    /**
     * Set on worker threads. Anything logged while delivering (the HTTP
     * stack's own logs, a sink writing through `tracing`) must not be fed
     * back into the queue.
     */
    static DELIVERY_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// `true` when called from one of the dispatcher's worker threads.
pub fn on_delivery_thread() -> bool {
    DELIVERY_THREAD.with(Cell::get)
}

// ---------------------------------------------------------------------------
// Queue entries
// ---------------------------------------------------------------------------

/**
 * One record on its way to Seq: the fully built request (owning a copy of
 * the payload) and the barrier token accounting for it.
 */
pub struct PendingTransmission {
    pub request: Request<Vec<u8>>,
    pub in_flight: InFlight,
}

/**
 * What `Dispatcher::write` does when the queue is full.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the record and report it through the fallback sink.
    /// `write` never blocks.
    #[default]
    Drop,

    /// Block the producer until a worker frees a slot.
    Block,
}

/**
 * Why a record did not make it into the queue. The rejected entry (and so
 * its `InFlight` token) has already been dropped.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    Full,
    Disconnected,
}

/**
 * Puts a pending transmission on the queue according to `policy`.
 */
pub fn submit(
    sender: &Sender<PendingTransmission>,
    pending: PendingTransmission,
    policy: OverflowPolicy,
) -> Result<(), Rejected> {
    match policy {
        OverflowPolicy::Drop => sender.try_send(pending).map_err(|err| match err {
            TrySendError::Full(_) => Rejected::Full,
            TrySendError::Disconnected(_) => Rejected::Disconnected,
        }),
        OverflowPolicy::Block => sender.send(pending).map_err(|_| Rejected::Disconnected),
    }
}

// ---------------------------------------------------------------------------
// WorkerPool
// ---------------------------------------------------------------------------

pub struct WorkerPool;

impl WorkerPool {
    /**
     * Spawns `workers` delivery threads sharing one receiver.
     *
     * Threads are detached: the dispatcher tracks outstanding work through
     * the shutdown barrier, not through join handles.
     */
    pub fn spawn(
        workers: usize,
        receiver: Receiver<PendingTransmission>,
        transport: Transport,
        fallback: Arc<FallbackSlot>,
    ) -> Result<(), Error> {
        for index in 0..workers.max(1) {
            let receiver = receiver.clone();
            let transport = transport.clone();
            let fallback = Arc::clone(&fallback);

            thread::Builder::new()
                .name(format!("seqlog-worker-{index}"))
                .spawn(move || Self::run_loop(&receiver, &transport, &fallback))
                .map_err(Error::WorkerSpawn)?;
        }

        Ok(())
    }

    fn run_loop(
        receiver: &Receiver<PendingTransmission>,
        transport: &Transport,
        fallback: &FallbackSlot,
    ) {
        DELIVERY_THREAD.with(|flag| flag.set(true));

        while let Ok(pending) = receiver.recv() {
            let PendingTransmission { request, in_flight } = pending;

            /*
             * One bad transmission must not take the worker down with it.
             * The token outlives the closure so `wait` returns only after
             * the panic has been reported.
             */
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                transmit(request, transport, fallback);
            }));

            if result.is_err() {
                fallback.error("Seq delivery worker panicked while sending a record", &[]);
            }

            drop(in_flight);
        }
    }
}

// ---------------------------------------------------------------------------
// One transmission
// ---------------------------------------------------------------------------

/**
 * Sends one record and reports the outcome.
 *
 * The sink is read once up front, so a concurrent enable/disable applies
 * to whole transmissions only.
 */
pub fn transmit(request: Request<Vec<u8>>, transport: &Transport, fallback: &FallbackSlot) {
    let sink = fallback.current();

    match transport.send(request) {
        Ok(response) => report_response(response, sink.as_deref()),
        Err(err) => {
            if let Some(sink) = sink {
                sink.report(
                    tracing::Level::ERROR,
                    "Failed doing Seq request or reading response",
                    &[("error", err.to_string())],
                );
            }
        }
    }
}

/*
 * Accepted responses, and any response when nobody is listening, are
 * dropped unread.
 */
fn report_response(response: Response<Body>, sink: Option<&dyn FallbackSink>) {
    let status = response.status().as_u16();
    let Some(sink) = sink.filter(|_| status != ACCEPTED_STATUS) else {
        return;
    };

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match response.into_body().read_to_vec() {
        Ok(content) => sink.report(
            tracing::Level::ERROR,
            "Seq error",
            &[
                ("error-message", extract_error_message(&content)),
                ("raw-content", String::from_utf8_lossy(&content).into_owned()),
                ("content-type", content_type),
                ("status-code", status.to_string()),
            ],
        ),
        Err(err) => sink.report(
            tracing::Level::ERROR,
            "Failed reading Seq response body",
            &[("error", format!("status code {status}: {err}"))],
        ),
    }
}
