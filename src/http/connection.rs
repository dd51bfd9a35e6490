use super::application::HttpApplication;
use super::parser::{ParseOutcome, RequestParser};
use crate::transport::{InputPipe, OutputPipe};
use crate::{BenchError, Result};
use tracing::trace;

/// Default limit on header bytes buffered without a boundary
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 16 * 1024;

/// Framing progress of the request currently being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Between requests
    StartLine,
    /// Part of a header block has arrived, the boundary has not
    Headers,
    /// A full header block is framed and ready for dispatch
    Body,
}

/// Drives one connection: read, parse, dispatch, flush, until the peer leaves
pub struct HttpConnection<I, O, A> {
    input: I,
    output: O,
    application: A,
    parser: RequestParser,
    state: ConnectionState,
    max_request_size: usize,
    requests: u64,
}

impl<I, O, A> HttpConnection<I, O, A>
where
    I: InputPipe,
    O: OutputPipe,
    A: HttpApplication,
{
    pub fn new(input: I, output: O, application: A) -> Self {
        Self {
            input,
            output,
            application,
            parser: RequestParser::new(),
            state: ConnectionState::StartLine,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            requests: 0,
        }
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn application(&self) -> &A {
        &self.application
    }

    /// Requests dispatched so far
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Serves requests until the peer closes the stream or an error occurs
    ///
    /// Both pipe halves are completed before returning, whatever the outcome.
    pub async fn execute(&mut self) -> Result<()> {
        let result = self.process_requests().await;

        self.input.complete(result.as_ref().err());
        self.output.complete().await;

        result
    }

    async fn process_requests(&mut self) -> Result<()> {
        loop {
            if !self.input.is_ready() {
                // No more data in the input
                self.application.on_read_completed(&mut self.output).await?;
            }

            let result = self.input.read().await?;
            let view = self.input.buffer();
            let mut consumed = 0;
            let mut examined = view.len();

            if !view.is_empty() {
                match self.parser.parse(&view, &mut self.application)? {
                    ParseOutcome::Complete { end } => {
                        self.state = ConnectionState::Body;
                        consumed = end;
                        examined = end;
                    }
                    ParseOutcome::Incomplete if view.len() > self.max_request_size => {
                        return Err(BenchError::RequestTooLarge {
                            limit: self.max_request_size,
                        });
                    }
                    ParseOutcome::Incomplete => self.state = ConnectionState::Headers,
                }

                if self.state != ConnectionState::Body && result.is_completed {
                    return Err(BenchError::UnexpectedEndOfData);
                }
            } else if result.is_completed {
                break;
            }

            drop(view);
            self.input.advance_to(consumed, examined);

            if self.state == ConnectionState::Body {
                self.application.process_request(&mut self.output)?;
                self.requests += 1;
                trace!(requests = self.requests, "Request processed");

                self.state = ConnectionState::StartLine;
            }
        }

        Ok(())
    }
}
