/*!
 * HTTP transport layer for POSTing CLEF payloads to Seq.
 *
 * Uses `ureq`: a pure-Rust blocking HTTP client with no async runtime.
 * Requests are executed on the dispatcher's worker threads, so blocking I/O
 * never reaches the producer.
 *
 * - Requests are built on the caller's thread (`build_request`) so that a
 *   malformed URL or API key is reported synchronously by `write`.
 * - Non-2xx statuses are ordinary responses, not errors: the worker needs
 *   the status, headers and body to report a rejection.
 * - Single attempt, no retries.
 */

use std::time::Duration;

use ureq::http::{Request, Response};
use ureq::{Agent, Body};

use crate::error::Error;
use crate::protocol::endpoint::TransportConfig;

/**
 * Builds the POST request for one record.
 *
 * Takes ownership of `payload`, which is the caller's copy of the record.
 */
pub fn build_request(config: &TransportConfig, payload: Vec<u8>) -> Result<Request<Vec<u8>>, Error> {
    let mut builder = Request::post(config.url());
    for (name, value) in config.headers() {
        builder = builder.header(name, value);
    }
    Ok(builder.body(payload)?)
}

/**
 * Thin wrapper around `ureq::Agent`. Cloned into every worker; the clones
 * share one connection pool.
 */
#[derive(Clone)]
pub struct Transport {
    agent: Agent,
}

impl Transport {
    /**
     * Creates a transport with the given timeouts. `None` leaves the
     * corresponding limit unset.
     */
    pub fn new(connect_timeout: Option<Duration>, request_timeout: Option<Duration>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_connect(connect_timeout)
            .timeout_global(request_timeout)
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent }
    }

    /**
     * Executes the request. `Err` means no response was received at all
     * (DNS, connect, TLS, timeout…).
     */
    pub fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Body>, ureq::Error> {
        self.agent.run(request)
    }
}
