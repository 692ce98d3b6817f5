use thiserror::Error;

use super::TransportError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session needs to have a tank")]
    MissingTank,
    #[error("no config provided for validation")]
    MissingConfig,
    #[error("session has to have a name to run or be polled")]
    MissingName,
    #[error("session has to have a name to stop")]
    MissingNameForStop,
    #[error("session config is invalid {reasons}")]
    InvalidConfig { reasons: String },
    #[error("failed to create session, try validating your config")]
    CreateRejected,
    #[error("{action} session {name}@{tank} failed {reasons}")]
    RemoteFailure {
        action: &'static str,
        name: String,
        tank: String,
        reasons: String,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
}
