//! The seam between the connection manager and the wire protocol.
//!
//! `RconManager` never touches sockets itself: it asks a `Connector` for a
//! fresh authenticated `Session` and drives commands through it. Timeouts are
//! applied by the caller, so implementations should simply fail on any
//! protocol or network error without retrying internally.

use async_trait::async_trait;

use crate::error::RconError;

/// Something that can open authenticated sessions to a single remote server
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The session type produced by this connector
    type Session: Session;

    /// Opens a new connection and authenticates it
    async fn connect(&self) -> Result<Self::Session, RconError>;
}

/// One authenticated request/response connection
///
/// Only one command may be in flight on a session at a time.
#[async_trait]
pub trait Session: Send + 'static {
    /// Sends `command` and returns the server's response text
    async fn send(&mut self, command: &str) -> Result<String, RconError>;

    /// Closes the connection
    ///
    /// The session must not be used afterwards.
    async fn close(&mut self) -> Result<(), RconError>;
}
