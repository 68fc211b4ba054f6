//! Accept Loop and Connection Tasks
//!
//! Each accepted socket gets its own task, so events for one connection are
//! always delivered one at a time while different connections run in
//! parallel on a multi-threaded runtime.
//!
//! ## Connection Task
//!
//! ```text
//! accept ──> on_open ──> ┌──────────────────────────────────┐
//!                        │ select!                          │
//!                        │   socket readable ──> on_data    │
//!                        │   Conn::write / Conn::close      │
//!                        │   engine shutdown                │
//!                        └────────────────┬─────────────────┘
//!                                         │ EOF, error, Close, Shutdown
//!                                         ▼
//!                                     on_close
//! ```
//!
//! Output returned by a callback is written and flushed before the callback's
//! action is applied, so a `Close` never drops a reply.

use crate::engine::conn::{Conn, ConnId, Outbound};
use crate::engine::options::EngineOptions;
use crate::engine::{Action, EventHandler};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{Builder, Runtime};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

/// Errors that stop the engine from serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The tokio runtime could not be built
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Counters maintained by the engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// A TCP engine driving one [`EventHandler`].
pub struct Engine<H> {
    handler: Arc<H>,
    options: EngineOptions,
    stats: Arc<EngineStats>,
    shutdown_tx: watch::Sender<bool>,
    next_id: AtomicU64,
}

impl<H: EventHandler> Engine<H> {
    pub fn new(handler: H, options: EngineOptions) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            handler: Arc::new(handler),
            options,
            stats: Arc::new(EngineStats::new()),
            shutdown_tx,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    /// Stops accepting and asks every connection task to close.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Accepts connections on `listener` until shutdown, then waits for every
    /// connection task to run its close callback.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Connection task failed");
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let engine = Arc::clone(&self);
                        tasks.spawn(async move { engine.run_connection(stream, addr).await });
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
            }
        }

        info!(
            connections = tasks.len(),
            "Engine stopping, closing remaining connections"
        );
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Connection task failed");
            }
        }
        Ok(())
    }

    async fn run_connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let id = ConnId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        if self.options.tcp_nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!(conn = %id, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let (outbound_tx, mut outbound) = mpsc::unbounded_channel();
        let conn = Conn::new(id, peer, outbound_tx);
        let (mut reader, writer) = stream.into_split();
        let mut writer = BufWriter::new(writer);
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut buffer = vec![0u8; self.options.read_chunk()];

        self.stats.connection_opened();
        debug!(conn = %id, peer = %peer, "Connection opened");

        let mut cause = None;
        let (out, action) = self.handler.on_open(&conn);
        let mut open = match self.respond(&mut writer, id, &out, action).await {
            Ok(open) => open,
            Err(e) => {
                cause = Some(e);
                false
            }
        };

        while open {
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                read = reader.read(&mut buffer) => match read {
                    Ok(0) => break,
                    Ok(n) => {
                        self.stats.bytes_read(n);
                        trace!(conn = %id, bytes = n, "Read frame");
                        let (out, action) = self.handler.on_data(&conn, &buffer[..n]);
                        match self.respond(&mut writer, id, &out, action).await {
                            Ok(still_open) => open = still_open,
                            Err(e) => cause = Some(e),
                        }
                        if cause.is_some() {
                            break;
                        }
                    }
                    Err(e) => {
                        cause = Some(e);
                        break;
                    }
                },
                Some(request) = outbound.recv() => match request {
                    Outbound::Write(data) => {
                        if let Err(e) = self.write_out(&mut writer, &data).await {
                            cause = Some(e);
                            break;
                        }
                    }
                    Outbound::Close => break,
                },
            }
        }

        match &cause {
            Some(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                debug!(conn = %id, "Connection reset by peer")
            }
            Some(e) => debug!(conn = %id, error = %e, "Connection closed with error"),
            None => debug!(conn = %id, "Connection closed"),
        }

        if let Err(e) = writer.shutdown().await {
            debug!(conn = %id, error = %e, "Failed to shut down write half");
        }
        self.stats.connection_closed();
        if self.handler.on_close(&conn, cause.as_ref()) == Action::Shutdown {
            info!(conn = %id, "Shutdown requested from close callback");
            self.shutdown();
        }
    }

    /// Writes a callback's output, then applies its action. Returns whether
    /// the connection stays open.
    async fn respond(
        &self,
        writer: &mut BufWriter<OwnedWriteHalf>,
        id: ConnId,
        out: &[u8],
        action: Action,
    ) -> io::Result<bool> {
        if !out.is_empty() {
            self.write_out(writer, out).await?;
        }

        Ok(match action {
            Action::Continue => true,
            Action::Close => {
                debug!(conn = %id, "Handler requested close");
                false
            }
            Action::Shutdown => {
                info!(conn = %id, "Handler requested server shutdown");
                self.shutdown();
                false
            }
        })
    }

    async fn write_out(
        &self,
        writer: &mut BufWriter<OwnedWriteHalf>,
        data: &[u8],
    ) -> io::Result<()> {
        writer.write_all(data).await?;
        writer.flush().await?;
        self.stats.bytes_written(data.len());
        Ok(())
    }
}

/// Resolves once shutdown has been signalled.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender gone means the engine is gone; nothing left to wait for.
            return;
        }
    }
}

fn build_runtime(options: &EngineOptions) -> io::Result<Runtime> {
    if options.multicore {
        Builder::new_multi_thread()
            .worker_threads(options.worker_threads())
            .enable_all()
            .build()
    } else {
        Builder::new_current_thread().enable_all().build()
    }
}

/// Serves `handler` on `addr` until a callback returns `Shutdown` or the
/// process receives Ctrl-C.
///
/// Builds its own runtime from `options` and blocks the calling thread.
pub fn serve<H: EventHandler>(
    handler: H,
    addr: &str,
    options: EngineOptions,
) -> Result<(), ServerError> {
    let runtime = build_runtime(&options).map_err(ServerError::Runtime)?;
    info!(
        workers = options.worker_threads(),
        multicore = options.multicore,
        "Engine runtime started"
    );
    let engine = Engine::new(handler, options);

    runtime.block_on(async move {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local = listener.local_addr()?;
        info!(addr = %local, "Listening");

        let signalled = Arc::clone(&engine);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, stopping server...");
                signalled.shutdown();
            }
        });

        engine.run(listener).await
    })?;

    info!("Server shutdown complete");
    Ok(())
}
