//! Tokio cooperative-scheduling backend.
//!
//! Sockets suspend the calling task instead of blocking an OS thread; the
//! idle queue pairs a mutex-guarded deque with a notifier so `blocking_get`
//! suspends cooperatively as well.

use std::collections::VecDeque;
use std::io;
use std::marker::PhantomData;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, Interest};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::time;
use tokio_util::codec::{Decoder, Encoder};

use super::{MessageCodec, QueueBackend, SocketBackend, SocketFactory};
use crate::driver::error::{RexProError, RexProResult};
use crate::message::{Request, Response};

/// Socket factory for the Tokio backend.
///
/// Generic over the message codec so server-compatible framing can be
/// plugged in without touching the transport.
pub struct TokioBackend<C: MessageCodec> {
    codec: PhantomData<fn() -> C>,
}

impl<C: MessageCodec> TokioBackend<C> {
    /// Create a Tokio socket factory.
    pub fn new() -> Self {
        Self { codec: PhantomData }
    }
}

impl<C: MessageCodec> Default for TokioBackend<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MessageCodec> Clone for TokioBackend<C> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<C: MessageCodec> SocketFactory for TokioBackend<C> {
    type Socket = TokioSocket<C>;

    fn new_socket(&self) -> TokioSocket<C> {
        TokioSocket::new()
    }
}

/// TCP socket sending whole messages through a [`MessageCodec`].
///
/// Starts unconnected; every I/O call is bounded by the configured timeout
/// when one is set.
pub struct TokioSocket<C: MessageCodec> {
    /// TCP stream, present once connected
    stream: Option<TcpStream>,
    /// Framing codec
    codec: C,
    /// Read buffer
    read_buffer: BytesMut,
    /// Write buffer
    write_buffer: BytesMut,
    /// Per-operation timeout
    timeout: Option<Duration>,
}

impl<C: MessageCodec> TokioSocket<C> {
    /// Create an unconnected socket.
    pub fn new() -> Self {
        Self {
            stream: None,
            codec: C::default(),
            read_buffer: BytesMut::with_capacity(8192),
            write_buffer: BytesMut::with_capacity(8192),
            timeout: None,
        }
    }

    /// Whether the socket is connected.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl<C: MessageCodec> Default for TokioSocket<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MessageCodec> SocketBackend for TokioSocket<C> {
    async fn connect(&mut self, host: &str, port: u16) -> RexProResult<()> {
        let connect = TcpStream::connect((host, port));
        let stream = match self.timeout {
            Some(t) => time::timeout(t, connect).await.map_err(|_| {
                RexProError::connection(format!("connect to {}:{} timed out", host, port))
            })??,
            None => connect.await?,
        };

        // Lower latency for small request/response round trips
        stream.set_nodelay(true).ok();

        self.read_buffer.clear();
        self.stream = Some(stream);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    async fn send(&mut self, request: &Request) -> RexProResult<()> {
        let Self {
            stream,
            codec,
            write_buffer,
            timeout,
            ..
        } = self;
        let stream = stream
            .as_mut()
            .ok_or_else(|| RexProError::connection("socket is not connected"))?;

        write_buffer.clear();
        codec.encode(request.clone(), write_buffer)?;

        let io = async {
            stream.write_all(write_buffer).await?;
            stream.flush().await?;
            Ok::<(), io::Error>(())
        };
        match timeout {
            Some(t) => time::timeout(*t, io)
                .await
                .map_err(|_| RexProError::connection("send timed out"))??,
            None => io.await?,
        }
        Ok(())
    }

    async fn receive(&mut self) -> RexProResult<Response> {
        let Self {
            stream,
            codec,
            read_buffer,
            timeout,
            ..
        } = self;
        let stream = stream
            .as_mut()
            .ok_or_else(|| RexProError::connection("socket is not connected"))?;

        let io = async {
            loop {
                if let Some(response) = codec.decode(read_buffer)? {
                    return Ok(response);
                }
                let n = stream.read_buf(read_buffer).await?;
                if n == 0 {
                    return Err(RexProError::connection("connection closed by server"));
                }
            }
        };
        match timeout {
            Some(t) => time::timeout(*t, io)
                .await
                .map_err(|_| RexProError::connection("receive timed out"))?,
            None => io.await,
        }
    }

    async fn poll(&mut self, timeout: Duration) -> RexProResult<(bool, bool)> {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return Ok((false, false)),
        };
        match time::timeout(timeout, stream.ready(Interest::READABLE | Interest::WRITABLE)).await {
            Ok(ready) => {
                let ready = ready?;
                Ok((ready.is_readable(), ready.is_writable()))
            }
            Err(_) => Ok((false, false)),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            let _ = stream.shutdown().await;
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

impl<C: MessageCodec> std::fmt::Debug for TokioSocket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSocket")
            .field("connected", &self.is_connected())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// FIFO idle queue for the Tokio backend.
pub struct TokioQueue<T> {
    /// Queued items
    items: Mutex<VecDeque<T>>,
    /// Wakes suspended getters when an item arrives
    notify: Notify,
}

impl<T> TokioQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }
}

impl<T> Default for TokioQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> QueueBackend<T> for TokioQueue<T> {
    async fn blocking_get(&self) -> T {
        loop {
            // Register for notification before checking, so a put between
            // the check and the await is not lost.
            let notified = self.notify.notified();
            if let Some(item) = self.try_get() {
                return item;
            }
            notified.await;
        }
    }

    fn try_get(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    fn put(&self, item: T) {
        self.items.lock().push_back(item);
        self.notify.notify_one();
    }

    fn size(&self) -> usize {
        self.items.lock().len()
    }
}

impl<T> std::fmt::Debug for TokioQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioQueue")
            .field("size", &self.items.lock().len())
            .finish()
    }
}
