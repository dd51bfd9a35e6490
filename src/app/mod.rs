//! The benchmark endpoints
//!
//! Three fixed routes, all answered with `200 OK`:
//!
//! - `GET /plaintext*` → `Hello, World!` as `text/plain`
//! - `GET /json*` → `{"message":"Hello, World!"}` as `application/json`
//! - anything else → an empty body
//!
//! Unknown routes get 200 with no body rather than 404; load generators only
//! ever look at throughput, and this keeps every response on the same path.

pub mod date;
pub mod json;


pub use date::DateCache;
pub use json::{HELLO_MESSAGE, HelloMessage, JsonContracts};

use crate::Result;
use crate::http::{BufferWriter, HttpApplication, StartLine};
use crate::transport::OutputPipe;
use http::Method;
use std::sync::Arc;

const HTTP11_OK: &[u8] = b"HTTP/1.1 200 OK\r\n";
const HEADER_SERVER: &[u8] = b"Server: Custom\r\n";
const HEADER_CONTENT_LENGTH: &[u8] = b"Content-Length: ";
const HEADER_CONTENT_LENGTH_ZERO: &[u8] = b"Content-Length: 0\r\n";
const HEADER_CONTENT_TYPE_TEXT: &[u8] = b"Content-Type: text/plain\r\n";
const HEADER_CONTENT_TYPE_JSON: &[u8] = b"Content-Type: application/json\r\n";
const CRLF: &[u8] = b"\r\n";
const END_OF_HEADERS: &[u8] = b"\r\n\r\n";

const PLAINTEXT_BODY: &[u8] = b"Hello, World!";

const PLAINTEXT_PATH: &[u8] = b"/plaintext";
const JSON_PATH: &[u8] = b"/json";

/// Response strategy chosen from a request's start line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Plaintext,
    Json,
    Default,
}

impl Route {
    /// Prefix match on the path, `GET` only
    pub fn classify(method: Option<&Method>, path: &[u8]) -> Self {
        if method != Some(&Method::GET) {
            return Route::Default;
        }

        if path.starts_with(PLAINTEXT_PATH) {
            Route::Plaintext
        } else if path.starts_with(JSON_PATH) {
            Route::Json
        } else {
            Route::Default
        }
    }
}

#[derive(Debug)]
struct Shared {
    date: Arc<DateCache>,
    json: JsonContracts,
    json_length: u64,
}

/// Per-connection application serving the benchmark routes
///
/// Cloning is cheap: the date cache and JSON contracts are shared, only the
/// route of the request in flight is per connection.
#[derive(Debug, Clone)]
pub struct BenchmarkApplication {
    shared: Arc<Shared>,
    route: Route,
}

impl BenchmarkApplication {
    pub fn new(date: Arc<DateCache>) -> Result<Self> {
        let mut json = JsonContracts::new();
        let json_length = json.register(&HELLO_MESSAGE)? as u64;

        Ok(Self {
            shared: Arc::new(Shared {
                date,
                json,
                json_length,
            }),
            route: Route::Default,
        })
    }

    /// Route of the most recent start line
    pub fn route(&self) -> Route {
        self.route
    }

    pub fn date_cache(&self) -> &Arc<DateCache> {
        &self.shared.date
    }

    fn write_common_headers<O: OutputPipe>(&self, writer: &mut BufferWriter<'_, O>) {
        writer.write(HTTP11_OK);
        writer.write(HEADER_SERVER);
        writer.write(&self.shared.date.header_line());
    }

    fn plaintext<O: OutputPipe>(&self, output: &mut O) -> Result<()> {
        let mut writer = BufferWriter::new(output);
        self.write_common_headers(&mut writer);

        writer.write(HEADER_CONTENT_TYPE_TEXT);
        writer.write(HEADER_CONTENT_LENGTH);
        writer.write_numeric(PLAINTEXT_BODY.len() as u64);
        writer.write(END_OF_HEADERS);

        writer.write(PLAINTEXT_BODY);
        writer.commit();
        Ok(())
    }

    fn json<O: OutputPipe>(&self, output: &mut O) -> Result<()> {
        let mut writer = BufferWriter::new(output);
        self.write_common_headers(&mut writer);

        writer.write(HEADER_CONTENT_TYPE_JSON);
        writer.write(HEADER_CONTENT_LENGTH);
        writer.write_numeric(self.shared.json_length);
        writer.write(END_OF_HEADERS);

        self.shared.json.serialize(&HELLO_MESSAGE, &mut writer)?;
        writer.commit();
        Ok(())
    }

    fn fallback<O: OutputPipe>(&self, output: &mut O) -> Result<()> {
        let mut writer = BufferWriter::new(output);
        self.write_common_headers(&mut writer);

        writer.write(HEADER_CONTENT_LENGTH_ZERO);
        writer.write(CRLF);
        writer.commit();
        Ok(())
    }
}

impl HttpApplication for BenchmarkApplication {
    fn on_start_line(&mut self, line: &StartLine<'_>) {
        self.route = Route::classify(line.method.as_ref(), line.path);
    }

    fn process_request<O: OutputPipe>(&mut self, output: &mut O) -> Result<()> {
        match self.route {
            Route::Plaintext => self.plaintext(output),
            Route::Json => self.json(output),
            Route::Default => self.fallback(output),
        }
    }
}
