//! Load-generating client for the benchmark routes

pub mod codec;

pub use codec::ResponseCodec;

use crate::{BenchError, Result};
use bytes::{Bytes, BytesMut};
use http::Response;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Decoder;

/// Configuration for [`BenchClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Timeout for each read or write
    pub io_timeout: Duration,
    /// Initial capacity of the receive buffer
    pub buffer_size: usize,
    /// Largest response accepted before the client gives up
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(30),
            buffer_size: 4096,
            max_response_size: 1024 * 1024,
        }
    }
}

/// Keep-alive HTTP/1.1 client that can pipeline requests
///
/// # Examples
///
/// ```no_run
/// use benchsrv::BenchClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = BenchClient::connect("127.0.0.1:8080".parse()?).await?;
///
///     let response = client.get("/plaintext").await?;
///     assert_eq!(response.body().as_ref(), b"Hello, World!");
///
///     let responses = client.pipeline(&["/json"; 16]).await?;
///     assert_eq!(responses.len(), 16);
///     Ok(())
/// }
/// ```
pub struct BenchClient {
    stream: TcpStream,
    codec: ResponseCodec,
    buffer: BytesMut,
    config: ClientConfig,
}

impl BenchClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    pub async fn connect_with_config(addr: SocketAddr, config: ClientConfig) -> Result<Self> {
        let stream = timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| BenchError::Timeout("Connection timeout".to_string()))??;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            codec: ResponseCodec::new(config.max_response_size),
            buffer: BytesMut::with_capacity(config.buffer_size),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Writes `bytes` as-is, without waiting for any response
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        timeout(self.config.io_timeout, self.stream.write_all(bytes))
            .await
            .map_err(|_| BenchError::Timeout("Write timeout".to_string()))??;
        Ok(())
    }

    pub async fn get(&mut self, path: &str) -> Result<Response<Bytes>> {
        self.send_raw(&request_bytes(path)).await?;
        self.read_response().await
    }

    /// Sends every request in one write, then reads the responses in order
    pub async fn pipeline<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<Vec<Response<Bytes>>> {
        let mut batch = Vec::new();
        for path in paths {
            batch.extend_from_slice(&request_bytes(path.as_ref()));
        }
        self.send_raw(&batch).await?;

        let mut responses = Vec::with_capacity(paths.len());
        for _ in paths {
            responses.push(self.read_response().await?);
        }
        Ok(responses)
    }

    /// Reads the next response off the connection
    pub async fn read_response(&mut self) -> Result<Response<Bytes>> {
        loop {
            if let Some(response) = self.codec.decode(&mut self.buffer)? {
                return Ok(response);
            }

            let n = timeout(self.config.io_timeout, self.stream.read_buf(&mut self.buffer))
                .await
                .map_err(|_| BenchError::Timeout("Read timeout".to_string()))??;

            if n == 0 {
                return match self.codec.decode_eof(&mut self.buffer)? {
                    Some(response) => Ok(response),
                    None => Err(BenchError::UnexpectedEndOfData),
                };
            }
        }
    }

    /// Half-closes the connection; the server finishes pending responses and closes its side
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

fn request_bytes(path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n\r\n").into_bytes()
}
