//! HTTP protocol implementation.
//!
//! This module serves files from disk, one request per connection.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection handler implementing the request-response state machine
//! - **`parser`**: Extracts the request path from the bytes of a single read
//! - **`request`**: Request representation and request-path to file-path resolution
//! - **`file`**: Loads a whole file into memory
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌──────────────┐
//!        │ AwaitRequest │ ← One bounded read
//!        └──────┬───────┘
//!               │ Two tokens found ─────────────┐ otherwise 400
//!               ▼                               │
//!        ┌──────────────┐                       │
//!        │    Parsed    │ ← Resolve path        │
//!        └──────┬───────┘                       │
//!               ▼                               │
//!        ┌──────────────┐                       │
//!        │   Resolved   │ ← Load file ──────────┤ missing → 404
//!        └──────┬───────┘                       │
//!               │ Loaded → 200                  │
//!               ▼                               │
//!        ┌──────────────┐                       │
//!        │  Responding  │ ◄─────────────────────┘
//!        └──────┬───────┘
//!               ▼
//!        ┌──────────────┐
//!        │    Closed    │ ← Always reached, exactly once
//!        └──────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use beacon::http::connection::{Connection, ConnectionSettings};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let settings = Arc::new(ConnectionSettings::default());
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let settings = settings.clone();
//!         tokio::spawn(async move {
//!             Connection::new(socket, settings).run().await;
//!         });
//!     }
//! }
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod connection;
pub mod writer;
pub mod mime;
pub mod file;
