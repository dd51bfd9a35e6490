use super::ServerConfig;
use crate::app::DateCache;
use crate::http::{HttpApplication, HttpConnection};
use crate::performance::BufferPool;
use crate::transport::{StreamInput, StreamOutput};
use crate::{BenchError, Result};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, error, info, warn};

/// TCP front end running one [`HttpConnection`] per accepted socket
///
/// Every connection gets its own clone of the application, so `A` should be
/// cheap to clone and keep shared state behind an `Arc`.
///
/// # Examples
///
/// ```no_run
/// use benchsrv::{BenchmarkApplication, DateCache, HttpServer, ServerConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let date = Arc::new(DateCache::new());
///     let application = BenchmarkApplication::new(Arc::clone(&date))?;
///
///     let server = HttpServer::new(ServerConfig::default(), application).with_date_cache(date);
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct HttpServer<A> {
    config: ServerConfig,
    application: A,
    date: Option<Arc<DateCache>>,
    buffers: BufferPool,
    shutdown_signal: Arc<broadcast::Sender<()>>,
    /// Subscribed at construction so a signal sent before `serve` starts is kept
    pending_shutdown: Mutex<Option<broadcast::Receiver<()>>>,
}

impl<A> HttpServer<A>
where
    A: HttpApplication + Clone + 'static,
{
    pub fn new(config: ServerConfig, application: A) -> Self {
        let (shutdown_signal, pending_shutdown) = broadcast::channel(1);
        let buffers = BufferPool::new(config.read_buffer_size, config.buffer_pool_size);
        Self {
            config,
            application,
            date: None,
            buffers,
            shutdown_signal: Arc::new(shutdown_signal),
            pending_shutdown: Mutex::new(Some(pending_shutdown)),
        }
    }

    /// Keeps `date` refreshed for as long as the server runs
    pub fn with_date_cache(mut self, date: Arc<DateCache>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffers
    }

    /// Returns a sender that stops the accept loop when signalled
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }

    /// Binds the configured address with `SO_REUSEADDR` and the configured backlog
    pub fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr;
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(self.config.backlog)?)
    }

    /// Binds and serves until Ctrl-C or an internal shutdown signal
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, max_connections = self.config.max_connections, "HTTP server listening");

        let mut shutdown_rx = self.shutdown_receiver();
        let refresh = self
            .date
            .as_ref()
            .map(|date| date.spawn_refresh(self.config.date_refresh_interval, self.shutdown_signal.subscribe()));

        let connection_count = Arc::new(AtomicUsize::new(0));

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let current_count = connection_count.load(Ordering::SeqCst);
                            if current_count >= self.config.max_connections {
                                warn!(%addr, current = current_count, limit = self.config.max_connections, "Connection rejected: limit reached");
                                continue;
                            }

                            let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                            debug!(%addr, current = new_count, "Accepted connection");

                            self.spawn_connection(stream, addr, Arc::clone(&connection_count));
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        if let Some(task) = refresh {
            task.abort();
        }

        info!("HTTP server stopped");
        Ok(())
    }

    fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        let pending = self
            .pending_shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        pending.unwrap_or_else(|| self.shutdown_signal.subscribe())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr, connection_count: Arc<AtomicUsize>) {
        if self.config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let (reader, writer) = stream.into_split();
        let input = StreamInput::new(reader, self.buffers.get()).with_idle_timeout(self.config.idle_timeout);
        let output = StreamOutput::new(writer, self.buffers.get(), self.config.write_segment_size);
        let mut connection = HttpConnection::new(input, output, self.application.clone())
            .with_max_request_size(self.config.max_request_size);

        let span = tracing::info_span!("connection", %addr);
        tokio::spawn(
            async move {
                match connection.execute().await {
                    Ok(()) => {}
                    Err(BenchError::Io(e)) => debug!(error = %e, "Connection dropped"),
                    Err(e @ BenchError::Timeout(_)) => debug!(error = %e, "Connection idle"),
                    Err(e) => warn!(error = %e, "Error handling connection"),
                }
                let final_count = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                debug!(requests = connection.requests(), current = final_count, "Connection closed");
            }
            .instrument(span),
        );
    }
}
