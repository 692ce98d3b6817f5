//! Shared HTTP transport: explicit timeout configuration and uniform
//! response handling for every call the client makes to a tank.
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::error::TransportError;
use crate::retry::RetryPolicy;

/// Timeout and retry knobs for talking to tanks. Every field has a non-zero
/// default and can be overridden individually before building a
/// [`Transport`].
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub dial_timeout: Duration,
    pub tls_handshake_timeout: Duration,
    pub request_timeout: Duration,
    pub prepare_retry_window: Duration,
    pub prepare_attempt_limit: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            tls_handshake_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            prepare_retry_window: Duration::from_secs(30),
            prepare_attempt_limit: 5,
        }
    }
}

/// An HTTP client bound to one set of [`TransportOptions`]. Cloning is cheap
/// and clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    options: TransportOptions,
}

impl Transport {
    /// Builds the underlying HTTP client from the given options.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BuildClient`] when the TLS backend cannot
    /// be initialized.
    pub fn new(options: TransportOptions) -> Result<Self, TransportError> {
        // reqwest folds the TLS handshake into its connect phase.
        let connect_timeout = options
            .dial_timeout
            .saturating_add(options.tls_handshake_timeout);
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(|source| TransportError::BuildClient { source })?;
        Ok(Self { http, options })
    }

    #[must_use]
    pub const fn options(&self) -> &TransportOptions {
        &self.options
    }

    #[must_use]
    pub const fn prepare_retry(&self) -> RetryPolicy {
        RetryPolicy {
            window: self.options.prepare_retry_window,
            attempt_limit: self.options.prepare_attempt_limit,
        }
    }

    pub(crate) async fn get_ok(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_owned(),
                source,
            })?;
        Self::read_ok_body(url, response).await
    }

    pub(crate) async fn post_yaml(&self, url: &str, body: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/yaml")
            .body(body.to_owned())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_owned(),
                source,
            })?;
        Self::read_ok_body(url, response).await
    }

    /// Anything other than a literal 200 is an error carrying the status
    /// code and raw body text.
    async fn read_ok_body(
        url: &str,
        response: reqwest::Response,
    ) -> Result<Vec<u8>, TransportError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_owned(),
                source,
            })?;
        if status != 200 {
            return Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }
}
