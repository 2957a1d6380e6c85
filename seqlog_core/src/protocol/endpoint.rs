/**
 * Immutable description of where records are POSTed and with which headers.
 *
 * Built once when the dispatcher is created and shared read-only (behind an
 * `Arc`) by every delivery worker. Construction does no network access and
 * no URL validation beyond rejecting an empty string. A URL the HTTP stack
 * cannot parse is only detected when the first request is built.
 */
use crate::error::Error;
use crate::protocol::constants::{API_KEY_HEADER, CLEF_CONTENT_TYPE, RAW_EVENTS_PATH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    url: String,
    api_key: Option<String>,
}

impl TransportConfig {
    /**
     * Builds the configuration for a Seq server.
     *
     * # Arguments
     * * `endpoint`: Base server URL, e.g. `http://localhost:5341/`. One
     *   trailing `/` is removed before the ingestion path is appended.
     * * `api_key`: Optional API key. `None` and `Some("")` both mean
     *   "send no `X-Seq-ApiKey` header".
     *
     * # Returns
     * `Err(Error::EmptyEndpoint)` if `endpoint` is empty.
     */
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self, Error> {
        if endpoint.is_empty() {
            return Err(Error::EmptyEndpoint);
        }

        let base = endpoint.strip_suffix('/').unwrap_or(endpoint);

        Ok(Self {
            url: format!("{base}{RAW_EVENTS_PATH}"),
            api_key: api_key.filter(|key| !key.is_empty()).map(str::to_string),
        })
    }

    /// Full ingestion URL, e.g. `http://localhost:5341/api/events/raw`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Headers attached to every request, content type first.
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        std::iter::once(("Content-Type", CLEF_CONTENT_TYPE))
            .chain(self.api_key.as_deref().map(|key| (API_KEY_HEADER, key)))
    }
}
