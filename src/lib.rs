//! Client library for driving tank load-testing agents through their HTTP
//! control API.
//!
//! A [`session::Session`] tracks one test run on one remote agent and walks
//! it through the agent's life-cycle breakpoints (validate, create, prepare,
//! run, stop) while accumulating an append-only failure history. The
//! [`client::Client`] applies one life-cycle operation to many sessions
//! concurrently and folds per-session errors into a single aggregate result.
//! All transport settings live in an explicit [`transport::TransportOptions`]
//! value; there is no process-wide mutable client state.
pub mod client;
pub mod error;
pub mod retry;
pub mod session;
pub mod tank;
pub mod transport;
pub mod wire;

mod logger;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::Client;
pub use logger::init_logging;
pub use session::{Config, Session};
pub use tank::Tank;
pub use transport::{Transport, TransportOptions};
