//! Session life-cycle state machine: one test run bound to one tank.
//!
//! Remote stage is authoritative; the local `stage`/`status` fields are
//! advisory mirrors refreshed by status queries. Every failure path funnels
//! through [`Session::set_failed`], which appends to the append-only
//! `failures` history and pins `status` to `"failed"`.
use tracing::{debug, error, warn};

use crate::error::{SessionError, TransportError};
use crate::tank::Tank;
use crate::transport::Transport;
use crate::wire::{self, CreateOutcome, FailureField, SessionStatus, ValidationVerdict};


const CREATE_BREAKPOINT: &str = "init";
const PREPARE_BREAKPOINT: &str = "start";

pub const STATUS_FAILED: &str = "failed";
pub const STATUS_DISCONNECT: &str = "disconnect";
const STAGE_VALIDATION: &str = "validation";

/// Opaque test-configuration payload; never parsed on this side.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub contents: String,
}

/// One test run on one tank.
///
/// `name` stays empty until the agent assigns one and is never reassigned
/// afterwards. `failures` only grows; nothing transitions `status` back to
/// healthy once a failure is recorded. A session must not be driven by two
/// overlapping batch calls; that discipline is on the caller.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub tank: Tank,
    pub config: Option<Config>,
    pub name: String,
    pub stage: String,
    pub status: String,
    pub failures: Vec<String>,
}

impl Session {
    #[must_use]
    pub fn new(tank_url: &str, config_contents: &str) -> Self {
        Self {
            tank: Tank::new(tank_url),
            config: Some(Config {
                contents: config_contents.to_owned(),
            }),
            ..Self::default()
        }
    }

    /// Sends the config to the tank's validate endpoint. Restarts the
    /// session at the validation stage: the failure history is cleared
    /// before anything else happens. Never assigns a name.
    ///
    /// # Errors
    ///
    /// Configuration errors (no tank, no config), transport errors, and a
    /// non-empty validation verdict all fail the call and are recorded in
    /// the failure history.
    pub async fn validate(&mut self, transport: &Transport) -> Result<(), SessionError> {
        self.stage = STAGE_VALIDATION.to_owned();
        self.failures.clear();
        self.check_tank()?;
        self.check_config()?;
        let url = format!("{}/validate", self.tank.url);
        let body = self.config_contents();
        let bytes = match transport.post_yaml(&url, &body).await {
            Ok(bytes) => bytes,
            Err(err) => return Err(self.record_transport(err)),
        };
        match wire::decode_validation(&bytes) {
            Ok(ValidationVerdict::Clean) => Ok(()),
            Ok(ValidationVerdict::Invalid(reasons)) => {
                let err = SessionError::InvalidConfig {
                    reasons: reasons.join("\n"),
                };
                error!("{}", err);
                self.set_failed(reasons);
                Err(err)
            }
            Err(err) => Err(self.record_transport(err)),
        }
    }

    /// Creates the remote session, stopping the agent at the `init`
    /// breakpoint, and stores the assigned name. Invoked lazily by
    /// [`Session::prepare`] and [`Session::run`] for unnamed sessions.
    pub(crate) async fn create(&mut self, transport: &Transport) -> Result<(), SessionError> {
        self.check_tank()?;
        self.check_config()?;
        let url = format!("{}/run?break={}", self.tank.url, CREATE_BREAKPOINT);
        let body = self.config_contents();
        let bytes = match transport.post_yaml(&url, &body).await {
            Ok(bytes) => bytes,
            Err(err) => return Err(self.record_transport(err)),
        };
        match wire::decode_create(&bytes) {
            Ok(CreateOutcome::Created(name)) => {
                debug!("created session {} on {}", name, self.tank.url);
                self.name = name;
            }
            Ok(CreateOutcome::Rejected) => {
                return Err(self.record(SessionError::CreateRejected));
            }
            Err(err) => return Err(self.record_transport(err)),
        }
        self.check_remote_failures(transport, "creating").await
    }

    /// Requests a run halted at the `start` breakpoint so the tank prepares
    /// without firing. Creates the remote session first when unnamed. The
    /// HTTP call runs under the transport's prepare retry policy, since a
    /// tank that is finishing a previous stage may briefly refuse it.
    ///
    /// # Errors
    ///
    /// Fails on missing tank, failed lazy creation, an exhausted retry
    /// policy, or failures reported by the agent after the transition.
    pub async fn prepare(&mut self, transport: &Transport) -> Result<(), SessionError> {
        self.check_tank()?;
        if !self.has_name() {
            self.create(transport).await?;
        }
        let url = format!(
            "{}/run?session={}&break={}",
            self.tank.url, self.name, PREPARE_BREAKPOINT
        );
        let retry = transport.prepare_retry();
        if let Err(err) = retry.run(|| transport.get_ok(&url)).await {
            return Err(self.record_transport(err));
        }
        self.check_remote_failures(transport, "preparing").await
    }

    /// Releases the session to run with no breakpoint. Creates the remote
    /// session first when unnamed. Single attempt, no retry.
    ///
    /// # Errors
    ///
    /// Fails on missing tank, failed lazy creation, transport errors, or
    /// failures reported by the agent after the transition.
    pub async fn run(&mut self, transport: &Transport) -> Result<(), SessionError> {
        self.check_tank()?;
        if !self.has_name() {
            self.create(transport).await?;
        }
        let url = format!("{}/run?session={}", self.tank.url, self.name);
        if let Err(err) = transport.get_ok(&url).await {
            return Err(self.record_transport(err));
        }
        self.check_remote_failures(transport, "starting").await
    }

    /// Asks the tank to finish the session. Stopping a session that was
    /// never created is a contract error; there is no lazy creation here.
    ///
    /// # Errors
    ///
    /// Fails on missing tank or name, transport errors, or failures
    /// reported by the agent after the transition.
    pub async fn stop(&mut self, transport: &Transport) -> Result<(), SessionError> {
        self.check_tank()?;
        if !self.has_name() {
            return Err(self.record(SessionError::MissingNameForStop));
        }
        let url = format!("{}/stop?session={}", self.tank.url, self.name);
        if let Err(err) = transport.get_ok(&url).await {
            return Err(self.record_transport(err));
        }
        self.check_remote_failures(transport, "stopping").await
    }

    /// Refreshes remote status; any failure the agent reports is a poll
    /// failure.
    ///
    /// # Errors
    ///
    /// Fails on missing tank or name, transport errors, or remote-reported
    /// failures.
    pub async fn poll(&mut self, transport: &Transport) -> Result<(), SessionError> {
        self.get_status(transport).await?;
        self.check_remote_failures(transport, "polling").await
    }

    /// Queries the tank for this session's status and refreshes the local
    /// `stage`/`status` mirrors from whatever string fields the response
    /// carries. The full decoded structure is returned for callers that
    /// need more than the mirrors.
    ///
    /// # Errors
    ///
    /// Fails on missing tank or name, or when the status call itself fails.
    /// A request-level failure sets the local status to `"disconnect"`
    /// without touching the failure history.
    pub async fn get_status(
        &mut self,
        transport: &Transport,
    ) -> Result<SessionStatus, SessionError> {
        self.check_tank()?;
        self.check_name()?;
        let url = format!("{}/status?session={}", self.tank.url, self.name);
        let bytes = match transport.get_ok(&url).await {
            Ok(bytes) => bytes,
            Err(err @ TransportError::Request { .. }) => {
                self.status = STATUS_DISCONNECT.to_owned();
                return Err(SessionError::Transport(err));
            }
            Err(err) => return Err(self.record_transport(err)),
        };
        let status = match wire::decode_status(&bytes) {
            Ok(status) => status,
            Err(err) => return Err(SessionError::Transport(err)),
        };
        if let Some(stage) = &status.current_stage {
            self.stage = stage.clone();
        }
        if let Some(text) = &status.status {
            self.status = text.clone();
        }
        Ok(status)
    }

    pub async fn is_prepared(&mut self, transport: &Transport) -> bool {
        self.stage_reached(transport, "prepare", true).await
    }

    pub async fn is_running(&mut self, transport: &Transport) -> bool {
        self.stage_reached(transport, "poll", false).await
    }

    pub async fn is_finished(&mut self, transport: &Transport) -> bool {
        self.stage_reached(transport, "finished", true).await
    }

    /// Re-queries status and reports whether the agent recorded failures,
    /// together with the extracted reasons. A status query that itself
    /// fails counts as failed; a `failures` field of an unexpected type is
    /// logged and treated as not failed.
    pub async fn is_failed(&mut self, transport: &Transport) -> (bool, Vec<String>) {
        let status = match self.get_status(transport).await {
            Ok(status) => status,
            Err(err) => {
                warn!("{}", err);
                return (true, vec![err.to_string()]);
            }
        };
        match status.failures {
            FailureField::Absent => (false, Vec::new()),
            FailureField::Reasons(reasons) => (true, reasons),
            FailureField::Unexpected(found) => {
                warn!(
                    "unexpected tank failures response; expected a list of reasons, got: {}",
                    found
                );
                (false, Vec::new())
            }
        }
    }

    #[must_use]
    pub fn has_tank(&self) -> bool {
        !self.tank.url.is_empty()
    }

    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    #[must_use]
    pub fn has_config(&self) -> bool {
        self.config
            .as_ref()
            .is_some_and(|config| !config.contents.is_empty())
    }

    /// The single mutation point for marking a session failed: appends the
    /// reasons to the history and pins the status.
    pub(crate) fn set_failed<I>(&mut self, reasons: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.failures.extend(reasons);
        self.status = STATUS_FAILED.to_owned();
    }

    async fn stage_reached(
        &mut self,
        transport: &Transport,
        stage: &str,
        completed: bool,
    ) -> bool {
        match self.get_status(transport).await {
            Ok(status) => {
                status.current_stage.as_deref() == Some(stage)
                    && status.stage_completed == Some(completed)
            }
            Err(err) => {
                warn!(
                    "status query for {}@{} failed: {}",
                    self.name, self.tank.url, err
                );
                false
            }
        }
    }

    async fn check_remote_failures(
        &mut self,
        transport: &Transport,
        action: &'static str,
    ) -> Result<(), SessionError> {
        let (failed, reasons) = self.is_failed(transport).await;
        if failed {
            self.set_failed(reasons);
            let err = SessionError::RemoteFailure {
                action,
                name: self.name.clone(),
                tank: self.tank.url.clone(),
                reasons: self.failures.join("; "),
            };
            error!("{}", err);
            return Err(err);
        }
        Ok(())
    }

    fn check_tank(&mut self) -> Result<(), SessionError> {
        if self.has_tank() {
            Ok(())
        } else {
            Err(self.record(SessionError::MissingTank))
        }
    }

    fn check_config(&mut self) -> Result<(), SessionError> {
        if self.has_config() {
            Ok(())
        } else {
            Err(self.record(SessionError::MissingConfig))
        }
    }

    fn check_name(&mut self) -> Result<(), SessionError> {
        if self.has_name() {
            Ok(())
        } else {
            Err(self.record(SessionError::MissingName))
        }
    }

    fn record(&mut self, err: SessionError) -> SessionError {
        error!("{}", err);
        self.set_failed([err.to_string()]);
        err
    }

    fn record_transport(&mut self, err: TransportError) -> SessionError {
        error!("{}", err);
        self.set_failed([err.to_string()]);
        SessionError::Transport(err)
    }

    fn config_contents(&self) -> String {
        self.config
            .as_ref()
            .map(|config| config.contents.clone())
            .unwrap_or_default()
    }
}
