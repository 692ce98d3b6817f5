//! Concurrent batch execution of session life-cycle operations.
//!
//! Each batch call fans one operation out across every session at once and
//! only returns after all of them have finished; one session's failure never
//! cancels another's in-flight call. Sessions are mutated in place, so the
//! caller can inspect per-session stage, status, and failure history
//! regardless of the aggregate outcome.
use futures_util::future;

use crate::error::{ClientError, ClientResult};
use crate::session::Session;
use crate::transport::{Transport, TransportOptions};


#[derive(Debug, Clone, Copy)]
enum BatchOp {
    Validate,
    Prepare,
    Run,
    Stop,
    Poll,
}

/// Batch executor over any number of sessions, holding the shared
/// [`Transport`].
#[derive(Debug, Clone)]
pub struct Client {
    transport: Transport,
}

impl Client {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built from the options.
    pub fn new(options: TransportOptions) -> ClientResult<Self> {
        Ok(Self {
            transport: Transport::new(options)?,
        })
    }

    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Validates every session's config on its tank.
    ///
    /// # Errors
    ///
    /// Returns the aggregate of every failing session's error message.
    pub async fn validate(&self, sessions: &mut [Session]) -> ClientResult<()> {
        self.run_batch(sessions, BatchOp::Validate).await
    }

    /// Advances every session to the prepare breakpoint, creating remote
    /// sessions lazily where needed.
    ///
    /// # Errors
    ///
    /// Returns the aggregate of every failing session's error message.
    pub async fn prepare(&self, sessions: &mut [Session]) -> ClientResult<()> {
        self.run_batch(sessions, BatchOp::Prepare).await
    }

    /// Releases every session to run with no breakpoint.
    ///
    /// # Errors
    ///
    /// Returns the aggregate of every failing session's error message.
    pub async fn run(&self, sessions: &mut [Session]) -> ClientResult<()> {
        self.run_batch(sessions, BatchOp::Run).await
    }

    /// Stops every session.
    ///
    /// # Errors
    ///
    /// Returns the aggregate of every failing session's error message.
    pub async fn stop(&self, sessions: &mut [Session]) -> ClientResult<()> {
        self.run_batch(sessions, BatchOp::Stop).await
    }

    /// Refreshes every session's status, treating remote-reported failures
    /// as errors.
    ///
    /// # Errors
    ///
    /// Returns the aggregate of every failing session's error message.
    pub async fn poll(&self, sessions: &mut [Session]) -> ClientResult<()> {
        self.run_batch(sessions, BatchOp::Poll).await
    }

    async fn run_batch(&self, sessions: &mut [Session], op: BatchOp) -> ClientResult<()> {
        let transport = &self.transport;
        let outcomes = future::join_all(sessions.iter_mut().map(|session| async move {
            match op {
                BatchOp::Validate => session.validate(transport).await,
                BatchOp::Prepare => session.prepare(transport).await,
                BatchOp::Run => session.run(transport).await,
                BatchOp::Stop => session.stop(transport).await,
                BatchOp::Poll => session.poll(transport).await,
            }
        }))
        .await;
        let errors: Vec<String> = outcomes
            .into_iter()
            .filter_map(|outcome| outcome.err().map(|err| err.to_string()))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::batch(&errors))
        }
    }
}
