use std::time::Duration;

use crate::error::RconConfigError;

/// Configuration provided to set up an `RconManager` instance.
///
/// All values are fixed for the lifetime of the manager.
#[derive(Debug, Clone, PartialEq)]
pub struct RconConfig {
    /// Hostname or IP address of the server
    pub host: String,
    /// RCON port of the server
    pub port: u16,
    /// The RCON password (`rcon.password` in `server.properties`)
    pub password: String,
    /// How long a single connect + authenticate attempt may take
    pub connect_timeout: Duration,
    /// How long a single command may take to be answered
    pub command_timeout: Duration,
    /// How long the persistent session sits idle before it is probed
    pub keepalive_interval: Duration,
    /// How long a caller waits for the persistent session before falling back
    /// to a one-shot connection
    pub ready_wait: Duration,
    /// Delay used after the first failure following a successful connect
    pub backoff_floor: Duration,
    /// Upper bound on the reconnect delay
    pub backoff_ceiling: Duration,
    /// Growth factor applied to the reconnect delay after each failure
    pub backoff_factor: f64,
    /// Command used to probe the persistent session
    pub keepalive_command: String,
}

impl RconConfig {
    /// Create a new `RconConfig` with default timings
    pub fn new<H: Into<String>, P: Into<String>>(host: H, port: u16, password: P) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(8),
            keepalive_interval: Duration::from_secs(30),
            ready_wait: Duration::from_secs(3),
            backoff_floor: Duration::from_secs(1),
            backoff_ceiling: Duration::from_secs(30),
            backoff_factor: 1.7,
            keepalive_command: "list".into(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_ready_wait(mut self, wait: Duration) -> Self {
        self.ready_wait = wait;
        self
    }

    /// Sets the floor, ceiling, and growth factor of the reconnect backoff
    pub fn with_backoff(mut self, floor: Duration, ceiling: Duration, factor: f64) -> Self {
        self.backoff_floor = floor;
        self.backoff_ceiling = ceiling;
        self.backoff_factor = factor;
        self
    }

    pub fn with_keepalive_command<S: Into<String>>(mut self, command: S) -> Self {
        self.keepalive_command = command.into();
        self
    }

    /// The `host:port` address of the server
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates aspects of the config
    ///
    /// The config will be returned to you if it is valid.
    pub fn validate(self) -> Result<Self, RconConfigError> {
        use RconConfigError::*;

        if self.host.trim().is_empty() {
            return Err(EmptyHost);
        }

        for (name, duration) in [
            ("connect timeout", self.connect_timeout),
            ("command timeout", self.command_timeout),
            ("keepalive interval", self.keepalive_interval),
            ("readiness wait", self.ready_wait),
            ("backoff floor", self.backoff_floor),
        ] {
            if duration.is_zero() {
                return Err(ZeroDuration(name));
            }
        }

        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return Err(BackoffFactor(self.backoff_factor));
        }

        if self.backoff_floor > self.backoff_ceiling {
            return Err(BackoffBounds {
                floor: self.backoff_floor,
                ceiling: self.backoff_ceiling,
            });
        }

        if self.ready_wait >= self.connect_timeout {
            return Err(ReadyWaitTooLong {
                ready_wait: self.ready_wait,
                connect_timeout: self.connect_timeout,
            });
        }

        Ok(self)
    }
}
