use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::server::admission::{Admission, Gate, Permit};

/// Source of accepted connections.
///
/// Implemented for [`TcpListener`]; tests can supply their own.
pub trait Listener: Send + 'static {
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Io, SocketAddr)>> + Send;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Listener for TcpListener {
    type Io = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Accept loop that hands every connection to its own task.
pub struct Server<L> {
    listener: L,
    settings: Arc<ConnectionSettings>,
    admission: Admission,
}

impl Server<TcpListener> {
    /// Binds the configured address. Failing here is fatal for the process.
    pub async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&cfg.server.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", cfg.server.listen_addr))?;

        Ok(Self::new(listener, cfg.connection_settings()).with_admission(cfg.server.admission))
    }
}

impl<L: Listener> Server<L> {
    pub fn new(listener: L, settings: ConnectionSettings) -> Self {
        Self {
            listener,
            settings: Arc::new(settings),
            admission: Admission::default(),
        }
    }

    pub fn with_admission(mut self, admission: Admission) -> Self {
        self.admission = admission;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the accept loop and returns a handle to stop it.
    pub fn start(self) -> anyhow::Result<ServerHandle> {
        let local_addr = self
            .local_addr()
            .context("Listener has no local address")?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let task = tokio::spawn(self.run_until(async move {
            // Dropping the handle stops the server too.
            let _ = signal.await;
        }));

        Ok(ServerHandle {
            local_addr,
            shutdown,
            task,
        })
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Accept errors are logged and skipped. Handlers already running are
    /// not waited for.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Server {
            mut listener,
            settings,
            admission,
        } = self;

        let default_document = settings.root.default_document();
        match listener.local_addr() {
            Ok(addr) => info!(%addr, ?admission, default_document, "Listening"),
            Err(_) => info!(?admission, default_document, "Listening"),
        }

        let mut gate = Gate::new(admission);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Accept loop stopped");
                    break;
                }

                (permit, accepted) = async {
                    let permit = gate.admit().await;
                    (permit, listener.accept().await)
                } => {
                    match accepted {
                        Ok((socket, peer)) => {
                            if let Some(available) = gate.available() {
                                tracing::trace!(available, "Handler slots left");
                            }
                            spawn_handler(socket, peer, settings.clone(), permit)
                        }
                        Err(e) => tracing::warn!(error = %e, "Failed to accept connection"),
                    }
                }
            }
        }
    }
}

fn spawn_handler<S>(socket: S, peer: SocketAddr, settings: Arc<ConnectionSettings>, permit: Permit)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tracing::debug!(%peer, "Accepted connection");

    tokio::spawn(async move {
        let outcome = Connection::new(socket, settings).run().await;
        tracing::trace!(%peer, ?outcome, "Connection closed");
        drop(permit);
    });
}

/// Handle to a running [`Server`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting and closes the listening socket.
    pub async fn stop(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(());
        self.task.await.context("Accept loop panicked")?;
        Ok(())
    }
}
