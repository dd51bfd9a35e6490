use super::parser::StartLine;
use crate::Result;
use crate::transport::OutputPipe;
use std::future::Future;

/// Per-connection request behaviour plugged into [`HttpConnection`](super::HttpConnection)
///
/// One value lives for the whole connection, so it may carry state from the
/// start line of a request to its dispatch. The connection loop calls, for
/// every request, `on_start_line`, then `on_header` for each header line if
/// [`WANTS_HEADERS`](Self::WANTS_HEADERS) is set, then `process_request`.
pub trait HttpApplication: Send {
    /// Whether header lines are split and reported through `on_header`
    const WANTS_HEADERS: bool = false;

    fn on_start_line(&mut self, line: &StartLine<'_>);

    fn on_header(&mut self, _name: &[u8], _value: &[u8]) {}

    /// Writes and commits the complete response for the current request
    fn process_request<O: OutputPipe>(&mut self, output: &mut O) -> Result<()>;

    /// Runs when the connection is about to wait for more input
    ///
    /// The default flushes every response written since the last wait.
    fn on_read_completed<O: OutputPipe>(
        &mut self,
        output: &mut O,
    ) -> impl Future<Output = Result<()>> + Send {
        output.flush()
    }
}
