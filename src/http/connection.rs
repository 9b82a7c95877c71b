use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::file;
use crate::http::mime::content_type_for;
use crate::http::parser::{parse_request, ParseError};
use crate::http::request::{DocumentRoot, Request};
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;

/// Size of the single read that makes up a request.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Largest read buffer a connection will allocate.
pub const MAX_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Per-server settings shared by every connection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub root: DocumentRoot,
    pub read_buffer_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            root: DocumentRoot::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// What a connection ended up answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 200 with a body of `bytes` bytes.
    Served { bytes: usize },
    NotFound,
    BadRequest,
}

impl From<&Response> for Outcome {
    fn from(response: &Response) -> Self {
        match response.status {
            StatusCode::Ok => Outcome::Served {
                bytes: response.body.len(),
            },
            StatusCode::NotFound => Outcome::NotFound,
            StatusCode::BadRequest => Outcome::BadRequest,
        }
    }
}

/// Handles exactly one request on one connection, then closes it.
pub struct Connection<S> {
    stream: S,
    settings: Arc<ConnectionSettings>,
    request: Option<Request>,
    state: ConnectionState,
}

pub enum ConnectionState {
    AwaitRequest,
    Parsed(Request),
    Resolved(PathBuf),
    Responding(Response),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, settings: Arc<ConnectionSettings>) -> Self {
        Self {
            stream,
            settings,
            request: None,
            state: ConnectionState::AwaitRequest,
        }
    }

    /// Drives the connection to `Closed`.
    ///
    /// Every path sends exactly one response and closes the stream once.
    /// Failures never escape: a bad read becomes a 400, a failed load a 404,
    /// and a failed write is dropped.
    pub async fn run(mut self) -> Outcome {
        let mut outcome = Outcome::BadRequest;

        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::AwaitRequest => match self.read_request().await {
                    Ok(req) => ConnectionState::Parsed(req),
                    Err(e) => {
                        tracing::debug!(error = ?e, "Ill-formed request");
                        ConnectionState::Responding(Response::bad_request())
                    }
                },

                ConnectionState::Parsed(req) => {
                    let path = self.settings.root.resolve(&req.path);
                    self.request = Some(req);
                    ConnectionState::Resolved(path)
                }

                ConnectionState::Resolved(path) => match file::load(&path).await {
                    Some(payload) => {
                        let content_type = content_type_for(&path.to_string_lossy());
                        ConnectionState::Responding(Response::ok(content_type, payload))
                    }
                    None => ConnectionState::Responding(Response::not_found()),
                },

                ConnectionState::Responding(response) => {
                    outcome = Outcome::from(&response);
                    self.log_response(&response);

                    let writer = ResponseWriter::new(&response);
                    if let Err(e) = writer.write_to_stream(&mut self.stream).await {
                        tracing::debug!(error = %e, "Failed to send response");
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        self.close().await;
        outcome
    }

    async fn read_request(&mut self) -> Result<Request, ParseError> {
        let size = self.settings.read_buffer_size.clamp(1, MAX_READ_BUFFER_SIZE);
        let mut buf = vec![0u8; size];

        // One bounded read is the whole request.
        let n = match self.stream.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read request");
                0
            }
        };

        parse_request(&buf[..n])
    }

    fn log_response(&self, response: &Response) {
        match &self.request {
            Some(req) => tracing::info!(
                method = %req.method,
                path = %req.path,
                status = response.status.as_u16(),
                content_type = response.header("Content-Type"),
                bytes = response.body.len(),
                "Request served"
            ),
            None => tracing::info!(status = response.status.as_u16(), "Request rejected"),
        }
    }

    async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(error = %e, "Shutdown after response failed");
        }
    }
}
