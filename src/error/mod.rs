mod client;
mod session;
mod transport;

pub use client::{ClientError, ClientResult};
pub use session::SessionError;
pub use transport::TransportError;
