/**
 * Synchronous error taxonomy.
 *
 * Only failures that happen on the caller's thread live here. Everything
 * that goes wrong after a record has been handed to a worker (network
 * errors, rejected batches, unreadable responses) is reported through the
 * fallback sink instead and never surfaces as an `Error`.
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The Seq endpoint passed at construction time was an empty string.
    #[error("empty Seq url")]
    EmptyEndpoint,

    /// The outbound HTTP request for a single record could not be built,
    /// typically because the configured URL or API key is not valid in a
    /// request line / header.
    #[error("cannot create a request to Seq: {0}")]
    RequestConstruction(#[from] ureq::http::Error),

    /// A delivery worker thread could not be started.
    #[error("failed to spawn Seq delivery worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
