//! A persistent RCON connection shared by every caller in the process.
//!
//! `RconManager` owns at most one live session. A background supervisor task
//! connects, keeps the session alive with a periodic probe, and reconnects
//! with exponential backoff whenever something goes wrong. Callers go through
//! `send`, which serializes access to the session and falls back to a
//! throwaway one-shot connection when the persistent one can't serve in time.
//!
//! Commands are delivered at most once: a command whose persistent send failed
//! is retried exactly once over a one-shot connection and never again.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time;

use crate::admin::AdminCommand;
use crate::backoff::Backoff;
use crate::config::RconConfig;
use crate::error::{RconConfigError, RconError};
use crate::protocol::RconConnector;
use crate::status::ServerStatus;
use crate::transport::{Connector, Session};

/// Responses to `reload confirm` that mean the server only knows plain `reload`
const RELOAD_CONFIRM_UNSUPPORTED: &[&str] =
    &["Unknown or incomplete command", "Incorrect argument"];

/// Handle to a managed RCON connection
///
/// This can be cloned and passed around as needed; all clones share the same
/// connection. The supervisor keeps running until `stop` is called.
pub struct RconManager<C: Connector = RconConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for RconManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connector> fmt::Debug for RconManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RconManager")
            .field("address", &self.inner.config.address())
            .field("ready", &self.is_ready())
            .finish()
    }
}

// Groups together the state shared with the supervisor task
struct Inner<C: Connector> {
    config: RconConfig,
    connector: C,
    /// The persistent session, if one is live
    ///
    /// Holding this lock is what gives a caller the right to use the session.
    session: Mutex<Option<C::Session>>,
    /// Set while the supervisor believes `session` is usable
    ready: watch::Sender<bool>,
    /// Set to ask the supervisor to shut down
    stop: watch::Sender<bool>,
    /// Wakes the supervisor after a caller discarded a broken session
    invalidated: Notify,
    /// The supervisor task, if one has been started
    task: Mutex<Option<JoinHandle<()>>>,
}

/// How an attempt to use the persistent session turned out
#[derive(Debug)]
enum Persistent {
    Served(String),
    /// The session did not become ready within the readiness wait
    NotReady,
    /// Readiness was signaled but the session was gone by the time we got
    /// the lock
    SessionLost,
    /// The session failed and has been discarded
    Failed(RconError),
    /// The command was refused without harming the session
    Rejected(RconError),
}

/// Why the supervisor stopped using a session
#[derive(Debug)]
enum SessionEnd {
    Stopped,
    Lost(String),
}

impl RconManager<RconConnector> {
    /// Create a new `RconManager` talking RCON over TCP
    ///
    /// The config will be validated before it is used. Nothing connects until
    /// `start` or `send` is called.
    pub fn new(config: RconConfig) -> Result<Self, RconConfigError> {
        let config = config.validate()?;
        let connector = RconConnector::from_config(&config);
        Ok(Self::with_connector(config, connector))
    }
}

impl<C: Connector> RconManager<C> {
    /// Create a new `RconManager` that opens sessions through `connector`
    ///
    /// The config is used as-is.
    pub fn with_connector(config: RconConfig, connector: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                session: Mutex::new(None),
                ready: watch::channel(false).0,
                stop: watch::channel(false).0,
                invalidated: Notify::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RconConfig {
        &self.inner.config
    }

    /// Starts the supervisor if it isn't already running
    ///
    /// This returns right away; it does not wait for a connection.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }

        self.inner.stop.send_replace(false);
        let inner = self.inner.clone();
        *task = Some(tokio::spawn(inner.supervise()));
    }

    /// Stops the supervisor and closes the persistent session
    ///
    /// Errors encountered while shutting down are logged, never returned.
    pub async fn stop(&self) {
        let mut task = self.inner.task.lock().await;
        self.inner.stop.send_replace(true);
        self.inner.ready.send_replace(false);

        if let Some(handle) = task.take() {
            if let Err(e) = handle.await {
                warn!("RCON supervisor task ended abnormally: {}", e);
            }
        }

        self.inner.teardown().await;
    }

    /// Returns true if the persistent session is currently believed usable
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Returns true if the supervisor task is running
    pub async fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Sends `command` to the server and returns its response
    ///
    /// The persistent session is used if it becomes ready within the
    /// configured readiness wait; otherwise, or if it fails, the command is sent
    /// over a one-shot connection instead. The error from the one-shot attempt
    /// is returned if that fails too. Commands the session refuses without
    /// failing, such as ones that are too long, are not retried.
    pub async fn send(&self, command: &str) -> Result<String, RconError> {
        self.start().await;

        match self.inner.send_persistent(command).await {
            Persistent::Served(response) => return Ok(response),
            Persistent::Rejected(e) => return Err(e),
            Persistent::NotReady => warn!(
                "RCON session not ready within {:?}; using a one-shot connection",
                self.inner.config.ready_wait
            ),
            Persistent::SessionLost => {
                warn!("RCON session was lost; using a one-shot connection")
            }
            Persistent::Failed(e) => warn!(
                "RCON command failed: {}; forcing a reconnect and retrying over a one-shot \
                connection",
                e
            ),
        }

        self.inner.send_oneshot(command).await
    }

    /// Sends a typed administration command
    pub async fn run(&self, command: &AdminCommand) -> Result<String, RconError> {
        self.send(&command.to_string()).await
    }

    /// Asks the server who is online
    ///
    /// This never fails; if the server can't be reached an empty status is
    /// returned.
    pub async fn get_status(&self) -> ServerStatus {
        match self.run(&AdminCommand::List).await {
            Ok(raw) => ServerStatus::parse(raw),
            Err(e) => {
                warn!("Failed to fetch server status: {}", e);
                ServerStatus::default()
            }
        }
    }

    /// Reloads the server, preferring Paper's `reload confirm`
    ///
    /// Plain `reload` is used when the server doesn't understand the
    /// `confirm` argument or the first attempt fails.
    pub async fn reload(&self) -> Result<String, RconError> {
        match self.run(&AdminCommand::Reload { confirm: true }).await {
            Ok(out) => {
                let out = out.trim();
                if RELOAD_CONFIRM_UNSUPPORTED
                    .iter()
                    .any(|pattern| out.contains(pattern))
                {
                    self.plain_reload().await
                } else {
                    Ok(out.to_string())
                }
            }
            Err(e) => {
                debug!("`reload confirm` failed ({}); trying plain `reload`", e);
                self.plain_reload().await
            }
        }
    }

    async fn plain_reload(&self) -> Result<String, RconError> {
        self.run(&AdminCommand::Reload { confirm: false })
            .await
            .map(|out| out.trim().to_string())
    }
}

impl<C: Connector> Inner<C> {
    /// The supervisor loop
    ///
    /// Never returns an error: every failure is logged and followed by a
    /// reconnect, until a stop is requested.
    async fn supervise(self: Arc<Self>) {
        let mut stop = self.stop.subscribe();
        let mut backoff = Backoff::new(
            self.config.backoff_floor,
            self.config.backoff_ceiling,
            self.config.backoff_factor,
        );

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            let attempt = tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => break,
                res = self.connect() => res,
            };

            let delay = match attempt {
                Ok(session) => {
                    self.install(session).await;
                    backoff.reset();

                    match self.keepalive(&mut stop).await {
                        SessionEnd::Stopped => break,
                        SessionEnd::Lost(reason) => {
                            let delay = backoff.failure();
                            warn!(
                                "RCON connection lost: {}; reconnecting in {:.1}s",
                                reason,
                                delay.as_secs_f64()
                            );
                            delay
                        }
                    }
                }
                Err(e) => {
                    let delay = backoff.failure();
                    warn!(
                        "RCON connection error: {}; retrying in {:.1}s ({} failures in a row)",
                        e,
                        delay.as_secs_f64(),
                        backoff.failures()
                    );
                    delay
                }
            };

            tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => break,
                _ = time::sleep(delay) => {}
            }
        }

        self.teardown().await;
        info!("RCON manager stopped");
    }

    /// Opens and authenticates a new session within the connect timeout
    async fn connect(&self) -> Result<C::Session, RconError> {
        info!("Connecting to RCON at {}", self.config.address());
        let session = bounded(
            self.config.connect_timeout,
            "connect",
            self.connector.connect(),
        )
        .await?;
        info!("Connected to RCON at {}", self.config.address());

        Ok(session)
    }

    /// Makes `session` the persistent session and signals readiness
    async fn install(&self, session: C::Session) {
        let mut slot = self.session.lock().await;
        self.discard(&mut slot).await;
        *slot = Some(session);
        self.ready.send_replace(true);
    }

    /// Probes the live session every keepalive interval until it fails or a
    /// stop is requested
    async fn keepalive(&self, stop: &mut watch::Receiver<bool>) -> SessionEnd {
        loop {
            tokio::select! {
                biased;
                _ = stop_requested(stop) => return SessionEnd::Stopped,
                _ = self.invalidated.notified() => {
                    // The notification may be left over from an earlier session
                    if self.session.lock().await.is_none() {
                        return SessionEnd::Lost("a command failed on the session".into());
                    }
                    continue;
                }
                _ = time::sleep(self.config.keepalive_interval) => {}
            }

            let mut slot = self.session.lock().await;
            let result = match slot.as_mut() {
                Some(session) => {
                    bounded(
                        self.config.command_timeout,
                        "keepalive",
                        session.send(&self.config.keepalive_command),
                    )
                    .await
                }
                None => return SessionEnd::Lost("the session disappeared".into()),
            };

            match result {
                Ok(_) => debug!("RCON keepalive succeeded"),
                Err(e) => {
                    self.discard(&mut slot).await;
                    return SessionEnd::Lost(format!("keepalive failed: {}", e));
                }
            }
        }
    }

    /// Tries to serve `command` over the persistent session
    async fn send_persistent(&self, command: &str) -> Persistent {
        let mut ready = self.ready.subscribe();
        match time::timeout(self.config.ready_wait, became_ready(&mut ready)).await {
            Ok(true) => {}
            _ => return Persistent::NotReady,
        }

        let mut slot = self.session.lock().await;
        let result = match slot.as_mut() {
            Some(session) => {
                bounded(
                    self.config.command_timeout,
                    "command",
                    session.send(command),
                )
                .await
            }
            None => return Persistent::SessionLost,
        };

        match result {
            Ok(response) => Persistent::Served(response),
            Err(e) if !e.is_session_fatal() => Persistent::Rejected(e),
            Err(e) => {
                self.discard(&mut slot).await;
                self.invalidated.notify_one();
                Persistent::Failed(e)
            }
        }
    }

    /// Serves `command` over a fresh connection that is closed afterwards
    ///
    /// This never touches the persistent session.
    async fn send_oneshot(&self, command: &str) -> Result<String, RconError> {
        debug!("One-shot RCON to {}: {}", self.config.address(), command);

        let mut session = bounded(
            self.config.connect_timeout,
            "connect",
            self.connector.connect(),
        )
        .await?;
        let result = bounded(
            self.config.command_timeout,
            "command",
            session.send(command),
        )
        .await;

        if let Err(e) = bounded(self.config.command_timeout, "close", session.close()).await {
            debug!("Failed to close one-shot RCON connection: {}", e);
        }

        result
    }

    /// Closes and clears the persistent session, if any
    async fn teardown(&self) {
        let mut slot = self.session.lock().await;
        self.discard(&mut slot).await;
    }

    /// Closes and clears the session in `slot`
    ///
    /// The caller must hold the session lock.
    async fn discard(&self, slot: &mut Option<C::Session>) {
        self.ready.send_replace(false);

        if let Some(mut session) = slot.take() {
            if let Err(e) = bounded(self.config.command_timeout, "close", session.close()).await {
                debug!("Failed to close RCON session: {}", e);
            }
        }
    }
}

/// Runs `fut`, failing with `RconError::Timeout` if it takes longer than `after`
async fn bounded<T, F>(after: Duration, during: &'static str, fut: F) -> Result<T, RconError>
where
    F: Future<Output = Result<T, RconError>>,
{
    match time::timeout(after, fut).await {
        Ok(res) => res,
        Err(_) => Err(RconError::Timeout { after, during }),
    }
}

/// Resolves once a stop has been requested
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    // An error means the sender is gone, which also means we should stop
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// Resolves to true once readiness is signaled
async fn became_ready(ready: &mut watch::Receiver<bool>) -> bool {
    ready.wait_for(|ready| *ready).await.is_ok()
}
