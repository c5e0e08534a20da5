//! # RexPro Driver
//!
//! A Rust client driver for [Rexster](https://github.com/tinkerpop/rexster)
//! and Titan graph databases speaking the RexPro session protocol.
//!
//! ## Features
//!
//! - **Sessions** - Authenticated server-side sessions bound to one graph
//! - **Async/Await** - Built on Tokio for high-performance async operations
//! - **Connection Pooling** - Idle connections are reused across acquisitions
//! - **Transactions** - Explicit transaction control with a scoped API
//! - **Failover** - Endpoint candidate sets with blacklist-driven retry
//! - **Pluggable Backends** - Sockets, queues, and wire codecs are injected
//!   traits, so the core runs under any concurrency model
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rexpro-driver = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Basic Usage
//!
//! ```ignore
//! use rexpro_driver::{ConnectionPool, PoolConfig, TokioBackend, params};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Pool over two candidate servers; a codec implementing
//!     // MessageCodec provides the wire format.
//!     let pool = ConnectionPool::new(
//!         PoolConfig::builder(vec!["server1", "server2"], 8184, "graph")
//!             .with_credentials("rexster", "password")
//!             .build(),
//!         TokioBackend::<MyCodec>::new(),
//!     );
//!
//!     // Acquire a connection and run a script
//!     let mut conn = pool.acquire().await?;
//!     let results = conn.execute(
//!         "g.V('name', name)",
//!         params! {"name" => "Alice"},
//!     ).await?;
//!     pool.close_connection(conn, true).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! For operations requiring atomicity, use explicit transactions:
//!
//! ```ignore
//! let mut conn = pool.acquire().await?;
//! conn.open_transaction().await?;
//! conn.execute("g.addVertex([name: 'Alice'])", params! {}).await?;
//! conn.close_transaction(true).await?;  // commit, false rolls back
//! pool.close_connection(conn, true).await?;
//! ```
//!
//! Or let the pool drive the whole lifecycle: the scoped form acquires a
//! connection, opens a transaction, commits on success, rolls back on
//! error, and always returns the connection to the pool:
//!
//! ```ignore
//! fn create_alice(conn: &mut Connection<TokioBackend<MyCodec>>)
//!     -> BoxFuture<'_, RexProResult<Vec<Value>>>
//! {
//!     Box::pin(async move {
//!         conn.execute("g.addVertex([name: 'Alice'])", params! {}).await
//!     })
//! }
//!
//! let results = pool.with_connection(create_alice).await?;
//! ```
//!
//! ## Failover
//!
//! Host and port accept either a single value or a candidate set. Each
//! hard connect draws one candidate at random, excluding endpoints that
//! recently failed; when every candidate has failed, the blacklist is
//! cleared so the full set becomes eligible again:
//!
//! ```ignore
//! let config = PoolConfig::new(vec!["server1", "server2", "server3"], 8184, "graph");
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`RexProResult`]. Transport faults and expired
//! sessions are retried internally within a shared attempt budget; script
//! faults carry the server's error payload and are never retried:
//!
//! ```ignore
//! match conn.execute("g.V().count()", params! {}).await {
//!     Ok(results) => println!("{:?}", results),
//!     Err(RexProError::Script { code, message }) => {
//!         eprintln!("script rejected: {} ({})", message, code)
//!     }
//!     Err(e) => eprintln!("error: {}", e),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Pool, connection, transaction, and configuration types
//! - [`message`] - Typed RexPro protocol messages
//! - [`backend`] - Pluggable socket, queue, and codec traits plus the
//!   shipped Tokio implementation

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod driver;
pub mod message;

// Re-exports for convenience
pub use driver::{
    AcquireOptions, Candidates, Connection, ConnectionPool, PoolConfig, PoolConfigBuilder,
    RexProError, RexProResult, TokioPool, Value, CONNECTION_ATTEMPTS,
};

pub use backend::{
    MessageCodec, QueueBackend, SocketBackend, SocketFactory, TokioBackend, TokioQueue,
    TokioSocket,
};

pub use message::{
    ErrorCode, ErrorResponse, Request, Response, ScriptExecute, SessionClose, SessionOpen,
};
