use thiserror::Error;

/// Error types for the benchsrv library
#[derive(Error, Debug)]
pub enum BenchError {
    /// Socket-level errors (bind, accept, read, write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before a full request header arrived
    #[error("Unexpected end of data")]
    UnexpectedEndOfData,

    /// The inbound buffer was split across several segments
    #[error("Buffer is not single segment")]
    MultiSegmentBuffer,

    /// A request header grew past the configured limit without a boundary
    #[error("Request header exceeds {limit} bytes")]
    RequestTooLarge { limit: usize },

    /// A value was serialized without a registered JSON contract
    #[error("Unexpected type in JSON contract cache: {0}")]
    UnregisteredType(&'static str),

    /// A serialized value did not match its registered encoded length
    #[error("JSON contract for {type_name} expects {expected} bytes, got {actual}")]
    ContractMismatch {
        type_name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed HTTP response seen by the benchmark client
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Result type for the benchsrv library
pub type Result<T> = std::result::Result<T, BenchError>;

pub mod app;
pub mod client;
pub mod http;
pub mod performance;
pub mod server;
pub mod transport;

// Re-export main types for convenience
pub use app::{BenchmarkApplication, DateCache, JsonContracts, Route};
pub use client::{BenchClient, ClientConfig, ResponseCodec};
pub use crate::http::{BufferWriter, ConnectionState, HttpApplication, HttpConnection, RequestParser};
pub use server::{HttpServer, ServerConfig};
pub use transport::{BufferView, InputPipe, OutputPipe, ReadResult, StreamInput, StreamOutput};
