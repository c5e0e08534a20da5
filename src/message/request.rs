//! RexPro request messages.
//!
//! Request messages are sent from the client to the server.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::driver::types::Value;

/// Session open request.
///
/// Establishes an authenticated server-side session bound to one graph.
/// The server answers with `SessionOpened` carrying the session key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOpen {
    /// Username for authentication (may be empty)
    pub username: String,
    /// Password for authentication (may be empty)
    pub password: String,
    /// Graph to bind the session to
    pub graph_name: String,
}

impl SessionOpen {
    /// Create a session open request.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        graph_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            graph_name: graph_name.into(),
        }
    }
}

/// Session close request.
///
/// Tears down a server-side session. `kill` is always sent as true by the
/// driver: the server must not keep the session alive after a close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClose {
    /// Session to close, if one was established
    pub session_key: Option<String>,
    /// Graph the session was bound to
    pub graph_name: String,
    /// Kill the session server-side
    pub kill: bool,
}

impl SessionClose {
    /// Create a session kill request.
    pub fn new(session_key: Option<String>, graph_name: impl Into<String>) -> Self {
        Self {
            session_key,
            graph_name: graph_name.into(),
            kill: true,
        }
    }
}

/// Script execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptExecute {
    /// Gremlin script to execute
    pub script: String,
    /// Script parameter bindings
    pub params: HashMap<String, Value>,
    /// Session the script runs in
    pub session_key: Option<String>,
    /// Wrap the script in its own variable scope
    pub isolate: bool,
    /// Ask the server to wrap the script in a transaction
    pub in_transaction: bool,
}

impl ScriptExecute {
    /// Create a script request with default flags (isolate, transaction-wrapped).
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            params: HashMap::new(),
            session_key: None,
            isolate: true,
            in_transaction: true,
        }
    }

    /// Set the parameter bindings.
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Set the session key.
    pub fn with_session(mut self, session_key: Option<String>) -> Self {
        self.session_key = session_key;
        self
    }

    /// Set the isolate flag.
    pub fn with_isolate(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    /// Set the transaction flag.
    pub fn with_transaction(mut self, in_transaction: bool) -> Self {
        self.in_transaction = in_transaction;
        self
    }
}

/// A request message sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Open a session
    SessionOpen(SessionOpen),
    /// Close a session
    SessionClose(SessionClose),
    /// Execute a script
    ScriptExecute(ScriptExecute),
}

impl Request {
    /// Short message name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Request::SessionOpen(_) => "SessionOpen",
            Request::SessionClose(_) => "SessionClose",
            Request::ScriptExecute(_) => "ScriptExecute",
        }
    }
}

impl From<SessionOpen> for Request {
    fn from(msg: SessionOpen) -> Self {
        Request::SessionOpen(msg)
    }
}

impl From<SessionClose> for Request {
    fn from(msg: SessionClose) -> Self {
        Request::SessionClose(msg)
    }
}

impl From<ScriptExecute> for Request {
    fn from(msg: ScriptExecute) -> Self {
        Request::ScriptExecute(msg)
    }
}
