use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {source}")]
    BuildClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode tank response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
    #[error("Unexpected {field} in tank response: got {found}")]
    UnexpectedShape {
        field: &'static str,
        found: &'static str,
    },
}

impl TransportError {
    /// Only request-level failures (connect, TLS, timeout, torn connection)
    /// are safe to repeat; non-200 and malformed bodies are not.
    pub(crate) const fn is_retryable(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}
