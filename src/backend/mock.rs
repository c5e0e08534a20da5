//! Scripted in-memory backend for tests.
//!
//! Plays the server role deterministically: connect outcomes, send faults,
//! and responses can be queued ahead of time, and every connect attempt and
//! request is recorded for assertions.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{SocketBackend, SocketFactory};
use crate::driver::error::{RexProError, RexProResult};
use crate::message::{Request, Response};

#[derive(Default)]
struct MockState {
    /// Upcoming connects that fail
    connect_failures: usize,
    /// Upcoming sends that fail with a transport error
    send_failures: usize,
    /// Overrides for the next SessionOpen responses
    session_open_responses: VecDeque<Response>,
    /// Overrides for the next SessionClose responses
    session_close_responses: VecDeque<Response>,
    /// Overrides for the next ScriptExecute responses
    script_responses: VecDeque<Response>,
    /// Overrides for the next poll results
    poll_results: VecDeque<(bool, bool)>,
    /// Responses waiting to be received
    pending: VecDeque<Response>,
    /// Every endpoint a socket tried to connect to
    connect_attempts: Vec<(String, u16)>,
    /// Every request sent
    requests: Vec<Request>,
    /// Session key counter
    session_counter: u64,
}

/// Shared-state socket factory for tests.
#[derive(Clone, Default)]
pub(crate) struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connect attempts fail.
    pub(crate) fn fail_connects(&self, n: usize) {
        self.state.lock().connect_failures = n;
    }

    /// Make the next `n` sends fail with a broken-pipe transport error.
    pub(crate) fn fail_sends(&self, n: usize) {
        self.state.lock().send_failures = n;
    }

    /// Queue a response for an upcoming SessionOpen.
    pub(crate) fn push_session_open_response(&self, response: Response) {
        self.state.lock().session_open_responses.push_back(response);
    }

    /// Queue a response for an upcoming SessionClose.
    pub(crate) fn push_session_close_response(&self, response: Response) {
        self.state.lock().session_close_responses.push_back(response);
    }

    /// Queue a response for an upcoming ScriptExecute.
    pub(crate) fn push_script_response(&self, response: Response) {
        self.state.lock().script_responses.push_back(response);
    }

    /// Queue a poll result.
    pub(crate) fn push_poll(&self, readable: bool, writable: bool) {
        self.state.lock().poll_results.push_back((readable, writable));
    }

    /// Endpoints connect was attempted against, in order.
    pub(crate) fn connect_attempts(&self) -> Vec<(String, u16)> {
        self.state.lock().connect_attempts.clone()
    }

    /// All requests sent, in order.
    pub(crate) fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Scripts sent via ScriptExecute, in order.
    pub(crate) fn scripts(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .filter_map(|r| match r {
                Request::ScriptExecute(msg) => Some(msg.script.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SocketFactory for MockBackend {
    type Socket = MockSocket;

    fn new_socket(&self) -> MockSocket {
        MockSocket {
            state: self.state.clone(),
            connected: false,
        }
    }
}

/// Socket handle sharing the scripted backend state.
pub(crate) struct MockSocket {
    state: Arc<Mutex<MockState>>,
    connected: bool,
}

impl SocketBackend for MockSocket {
    async fn connect(&mut self, host: &str, port: u16) -> RexProResult<()> {
        let mut state = self.state.lock();
        state.connect_attempts.push((host.to_string(), port));
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(RexProError::connection(format!(
                "mock refused {}:{}",
                host, port
            )));
        }
        self.connected = true;
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: Option<Duration>) {}

    async fn send(&mut self, request: &Request) -> RexProResult<()> {
        if !self.connected {
            return Err(RexProError::connection("mock socket is not connected"));
        }
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if state.send_failures > 0 {
            state.send_failures -= 1;
            return Err(RexProError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock transport fault",
            )));
        }
        let response = match request {
            Request::SessionOpen(_) => state.session_open_responses.pop_front().unwrap_or_else(|| {
                state.session_counter += 1;
                Response::SessionOpened {
                    session_key: format!("session-{}", state.session_counter),
                }
            }),
            Request::SessionClose(_) => state
                .session_close_responses
                .pop_front()
                .unwrap_or(Response::Ack),
            Request::ScriptExecute(_) => state
                .script_responses
                .pop_front()
                .unwrap_or_else(|| Response::Results(Vec::new())),
        };
        state.pending.push_back(response);
        Ok(())
    }

    async fn receive(&mut self) -> RexProResult<Response> {
        self.state
            .lock()
            .pending
            .pop_front()
            .ok_or_else(|| RexProError::protocol("mock has no pending response"))
    }

    async fn poll(&mut self, _timeout: Duration) -> RexProResult<(bool, bool)> {
        if !self.connected {
            return Ok((false, false));
        }
        Ok(self
            .state
            .lock()
            .poll_results
            .pop_front()
            .unwrap_or((true, true)))
    }

    async fn shutdown(&mut self) {
        self.connected = false;
    }

    fn close(&mut self) {
        self.connected = false;
    }
}
