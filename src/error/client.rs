use thiserror::Error;

use super::{SessionError, TransportError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("{messages}")]
    Batch { messages: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub(crate) fn batch(messages: &[String]) -> Self {
        Self::Batch {
            messages: messages.join("; "),
        }
    }
}
