//! Tank agent handle and session enumeration.
use crate::error::TransportError;
use crate::session::Session;
use crate::transport::Transport;
use crate::wire;

/// One remote tank agent, identified by its base address. Stateless beyond
/// the address; several sessions may point at the same tank.
#[derive(Debug, Clone, Default)]
pub struct Tank {
    pub url: String,
}

impl Tank {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
        }
    }

    /// Lists every session currently live on this tank, with whatever
    /// status the agent reports for it. Useful for reattaching to agents
    /// this process did not create sessions on. The returned order carries
    /// no meaning.
    ///
    /// # Errors
    ///
    /// Fails when the status call fails or the response is not an object
    /// keyed by session name.
    pub async fn sessions(&self, transport: &Transport) -> Result<Vec<Session>, TransportError> {
        let url = format!("{}/status", self.url);
        let bytes = transport.get_ok(&url).await?;
        let entries = wire::decode_session_map(&bytes)?;
        Ok(entries
            .into_iter()
            .map(|(name, status)| Session {
                tank: self.clone(),
                name,
                status: status.unwrap_or_default(),
                ..Session::default()
            })
            .collect())
    }
}
