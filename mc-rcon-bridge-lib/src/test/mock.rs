//! A scripted in-memory `Connector` for exercising `RconManager`

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant};

use crate::error::RconError;
use crate::protocol::MAX_COMMAND_LEN;
use crate::transport::{Connector, Session};

/// What the next call to `connect` does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectStep {
    Succeed,
    Fail,
    /// Never completes
    Hang,
}

#[derive(Debug, Default)]
pub struct MockState {
    /// Outcomes for upcoming connects; `Succeed` once this runs out
    plan: Mutex<VecDeque<ConnectStep>>,
    connect_times: Mutex<Vec<Instant>>,
    last_session_id: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// How many upcoming sends fail
    failing_sends: AtomicUsize,
    send_delay: Mutex<Duration>,
    responses: Mutex<HashMap<String, String>>,
    /// Every successful send as (session id, command)
    sent: Mutex<Vec<(usize, String)>>,
}

impl MockState {
    pub fn plan<I: IntoIterator<Item = ConnectStep>>(&self, steps: I) {
        self.plan.lock().unwrap().extend(steps);
    }

    pub fn fail_next_sends(&self, n: usize) {
        self.failing_sends.store(n, SeqCst);
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = delay;
    }

    pub fn set_response(&self, command: &str, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.into(), response.into());
    }

    /// Number of connect attempts so far, successful or not
    pub fn connects(&self) -> usize {
        self.connect_times.lock().unwrap().len()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.connect_times.lock().unwrap().clone()
    }

    /// Number of sessions opened and not yet closed or dropped
    pub fn live(&self) -> usize {
        self.live.load(SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(SeqCst)
    }

    pub fn sent(&self) -> Vec<(usize, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self) -> Result<MockSession, RconError> {
        self.state.connect_times.lock().unwrap().push(Instant::now());
        let step = self
            .state
            .plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectStep::Succeed);

        match step {
            ConnectStep::Succeed => {
                let id = self.state.last_session_id.fetch_add(1, SeqCst) + 1;
                let live = self.state.live.fetch_add(1, SeqCst) + 1;
                self.state.max_live.fetch_max(live, SeqCst);

                Ok(MockSession {
                    id,
                    state: self.state.clone(),
                    open: true,
                })
            }
            ConnectStep::Fail => Err(RconError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            ConnectStep::Hang => std::future::pending().await,
        }
    }
}

#[derive(Debug)]
pub struct MockSession {
    id: usize,
    state: Arc<MockState>,
    open: bool,
}

/// Counts a send as in flight until dropped, even if the send is cancelled
struct InFlight<'a>(&'a MockState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.in_flight.fetch_add(1, SeqCst) + 1;
        state.max_in_flight.fetch_max(now, SeqCst);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, SeqCst);
    }
}

#[async_trait]
impl Session for MockSession {
    async fn send(&mut self, command: &str) -> Result<String, RconError> {
        assert!(self.open, "send on a closed session");
        if command.len() > MAX_COMMAND_LEN {
            return Err(RconError::CommandTooLong {
                len: command.len(),
                max: MAX_COMMAND_LEN,
            });
        }
        let _in_flight = InFlight::enter(&self.state);

        let delay = *self.state.send_delay.lock().unwrap();
        if !delay.is_zero() {
            time::sleep(delay).await;
        }

        if self
            .state
            .failing_sends
            .fetch_update(SeqCst, SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RconError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        self.state
            .sent
            .lock()
            .unwrap()
            .push((self.id, command.to_string()));

        let response = self.state.responses.lock().unwrap().get(command).cloned();
        Ok(response.unwrap_or_else(|| format!("ran {}", command)))
    }

    async fn close(&mut self) -> Result<(), RconError> {
        if self.open {
            self.open = false;
            self.state.live.fetch_sub(1, SeqCst);
        }
        Ok(())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if self.open {
            self.state.live.fetch_sub(1, SeqCst);
        }
    }
}
