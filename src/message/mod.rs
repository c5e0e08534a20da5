//! RexPro protocol messages.
//!
//! Typed request/response messages exchanged with a Rexster server over a
//! stateful session channel. The byte-level wire encoding is the concern of
//! a [`MessageCodec`](crate::backend::MessageCodec) implementation; this
//! module only defines the message shapes it marshals.
//!
//! ```text
//! ConnectionPool
//!   └── Connection
//!         ├── SocketBackend (transport + framing)
//!         │     └── MessageCodec (marshalling)
//!         └── Message Types (this module)
//! ```

mod request;
mod response;

pub use request::{Request, ScriptExecute, SessionClose, SessionOpen};
pub use response::{ErrorCode, ErrorResponse, Response};
