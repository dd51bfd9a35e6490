//! HTTP/1.1 request framing and response encoding
//!
//! This is deliberately not an HTTP library. It recognises where a request
//! header block ends, pulls the method and path out of the first line, and
//! leaves everything else to the [`HttpApplication`] plugged into the loop.
//!
//! - **`parser`**: boundary scan and start-line extraction
//! - **`writer`**: composes responses inside transport-provided memory
//! - **`application`**: the per-connection callback contract
//! - **`connection`**: the read/parse/dispatch/flush loop
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  StartLine  │ ← Between requests
//!        └──────┬──────┘
//!               │ partial header block
//!               ▼
//!        ┌─────────────┐
//!        │   Headers   │ ← Wait for the rest
//!        └──────┬──────┘
//!               │ "\r\n\r\n" found
//!               ▼
//!        ┌─────────────┐
//!        │    Body     │ ← Dispatch to the application
//!        └──────┬──────┘
//!               │ Response committed
//!               └─ back to StartLine (same connection)
//! ```
//!
//! Responses are only flushed when the loop is about to wait for the peer, so
//! pipelined requests that arrive together leave in one write.

pub mod application;
pub mod connection;
pub mod parser;
pub mod writer;


pub use application::HttpApplication;
pub use connection::{ConnectionState, HttpConnection};
pub use parser::{ParseOutcome, RequestParser, StartLine};
pub use writer::BufferWriter;
