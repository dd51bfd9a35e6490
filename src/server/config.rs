use crate::app::date::DEFAULT_REFRESH_INTERVAL;
use crate::http::connection::DEFAULT_MAX_REQUEST_SIZE;
use crate::{BenchError, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;

/// Listener and per-connection settings of [`HttpServer`](super::HttpServer)
///
/// # Examples
///
/// ```
/// use benchsrv::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_bind_addr("0.0.0.0:9000".parse().unwrap())
///     .with_max_connections(4096)
///     .with_idle_timeout(Some(Duration::from_secs(5)));
///
/// assert_eq!(config.max_connections, 4096);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Listen backlog
    pub backlog: u32,
    /// Initial capacity of each connection's inbound buffer
    pub read_buffer_size: usize,
    /// Minimum size of the writable region handed out by the output pipe
    pub write_segment_size: usize,
    /// Bytes that may be buffered without a complete header block
    pub max_request_size: usize,
    /// How long a connection may wait for the peer before it is dropped
    pub idle_timeout: Option<Duration>,
    /// Cadence of the cached `Date` header
    pub date_refresh_interval: Duration,
    /// Buffers kept for reuse across connections
    pub buffer_pool_size: usize,
    /// Sets `TCP_NODELAY` on accepted sockets
    pub nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_connections: 1024,
            backlog: 1024,
            read_buffer_size: 4096,
            write_segment_size: 4096,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            idle_timeout: Some(Duration::from_secs(60)),
            date_refresh_interval: DEFAULT_REFRESH_INTERVAL,
            buffer_pool_size: 256,
            nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Builds a config from the command line's `[port|addr]` argument and the
    /// `BENCHSRV_MAX_CONNECTIONS` value, either of which may be absent
    ///
    /// A bare port binds on localhost.
    pub fn from_args(bind: Option<&str>, max_connections: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(bind) = bind {
            let addr = match bind.parse::<u16>() {
                Ok(port) => SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
                Err(_) => bind
                    .parse::<SocketAddr>()
                    .map_err(|e| BenchError::Config(format!("invalid port or address {bind:?}: {e}")))?,
            };
            config.bind_addr = addr;
        }

        if let Some(value) = max_connections {
            config.max_connections = value
                .parse()
                .map_err(|e| BenchError::Config(format!("invalid connection limit {value:?}: {e}")))?;
        }

        Ok(config)
    }

    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_buffer_sizes(mut self, read_buffer_size: usize, write_segment_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self.write_segment_size = write_segment_size;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_date_refresh_interval(mut self, interval: Duration) -> Self {
        self.date_refresh_interval = interval;
        self
    }

    pub fn with_buffer_pool_size(mut self, buffer_pool_size: usize) -> Self {
        self.buffer_pool_size = buffer_pool_size;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}
