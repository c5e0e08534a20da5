//! Pluggable concurrency backends.
//!
//! The pool and connection algorithms are written against these traits so
//! the same code runs on cooperative-scheduling I/O (the shipped Tokio
//! backend) or any other concurrency model the application provides.
//! Implementations are injected at construction time through
//! [`SocketFactory`]; the core never picks a backend on its own.
//!
//! Every socket and queue call is a potential suspension point. The core
//! adds no locking: a connection is owned by exactly one caller between
//! acquire and release, and the idle queue relies on the queue backend's
//! own guarantees.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use tokio_util::codec::{Decoder, Encoder};

use crate::driver::error::{RexProError, RexProResult};
use crate::message::{Request, Response};

pub mod tokio;

#[cfg(test)]
pub(crate) mod mock;

pub use self::tokio::{TokioBackend, TokioQueue, TokioSocket};

/// Marshals request/response messages to and from the wire.
///
/// The driver does not define the byte format; any framing codec that
/// encodes [`Request`] and decodes [`Response`] plugs in here. This is the
/// standard `tokio-util` codec shape, so server-compatible codecs can be
/// reused directly.
pub trait MessageCodec:
    Decoder<Item = Response, Error = RexProError>
    + Encoder<Request, Error = RexProError>
    + Default
    + Send
{
}

impl<C> MessageCodec for C where
    C: Decoder<Item = Response, Error = RexProError>
        + Encoder<Request, Error = RexProError>
        + Default
        + Send
{
}

/// One physical link to a server, under one concurrency model.
///
/// A socket starts unconnected; `connect` binds it to an endpoint, after
/// which `send`/`receive` round-trip whole messages. `poll` is a readiness
/// probe used by the health check and must not consume data.
pub trait SocketBackend: Send {
    /// Connect to an endpoint.
    async fn connect(&mut self, host: &str, port: u16) -> RexProResult<()>;

    /// Set the timeout applied to connect/send/receive.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    /// Send one request message.
    async fn send(&mut self, request: &Request) -> RexProResult<()>;

    /// Receive one response message.
    async fn receive(&mut self) -> RexProResult<Response>;

    /// Poll readiness within `timeout`, returning `(readable, writable)`.
    ///
    /// A timeout is not an error; it reports `(false, false)`.
    async fn poll(&mut self, timeout: Duration) -> RexProResult<(bool, bool)>;

    /// Shut down the transport, best effort.
    async fn shutdown(&mut self);

    /// Release the underlying handle.
    fn close(&mut self);
}

/// Creates sockets for one concurrency backend.
///
/// A connection keeps its factory and asks it for a fresh socket on every
/// hard open, so endpoint failover never reuses a broken transport.
pub trait SocketFactory: Clone + Send {
    /// Socket type produced by this factory.
    type Socket: SocketBackend;

    /// Create a new, unconnected socket.
    fn new_socket(&self) -> Self::Socket;
}

/// FIFO container holding idle pool items, safe under one concurrency model.
pub trait QueueBackend<T>: Default + Send + Sync {
    /// Take an item, suspending until one is available.
    async fn blocking_get(&self) -> T;

    /// Take an item if one is immediately available.
    fn try_get(&self) -> Option<T>;

    /// Put an item into the queue.
    fn put(&self, item: T);

    /// Number of queued items.
    fn size(&self) -> usize;

    /// Whether the queue is empty.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
