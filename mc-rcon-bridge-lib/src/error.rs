use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to a remote server over RCON
#[derive(Error, Debug)]
pub enum RconError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("the server rejected the RCON password")]
    AuthRejected,
    #[error("command is {len} bytes long but at most {max} bytes can be sent")]
    CommandTooLong { len: usize, max: usize },
    #[error("received a malformed packet: {0}")]
    Malformed(String),
    /// A bounded wait elapsed
    ///
    /// `during` names the operation that was being waited on (e.g. "connect").
    #[error("timed out after {after:?} during {during}")]
    Timeout {
        after: Duration,
        during: &'static str,
    },
    #[error("the connection was closed by the server")]
    Closed,
}

impl RconError {
    /// Returns true if this error is a `Timeout`
    pub fn is_timeout(&self) -> bool {
        matches!(self, RconError::Timeout { .. })
    }

    /// Returns true if this error means the session it came from can't be
    /// used anymore
    ///
    /// Commands rejected before anything was written leave the session intact.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, RconError::CommandTooLong { .. })
    }
}

/// Errors regarding an `RconConfig`
#[derive(Error, Debug, PartialEq)]
pub enum RconConfigError {
    #[error("the RCON host must not be empty")]
    EmptyHost,
    #[error("the {0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("the backoff factor must be at least 1.0 (got {0})")]
    BackoffFactor(f64),
    #[error("the backoff floor ({floor:?}) must not exceed the backoff ceiling ({ceiling:?})")]
    BackoffBounds { floor: Duration, ceiling: Duration },
    #[error(
        "the readiness wait ({ready_wait:?}) must be shorter than the connect timeout \
        ({connect_timeout:?})"
    )]
    ReadyWaitTooLong {
        ready_wait: Duration,
        connect_timeout: Duration,
    },
}
