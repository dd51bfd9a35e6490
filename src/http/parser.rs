use super::application::HttpApplication;
use crate::Result;
use crate::transport::BufferView;
use http::{Method, Version};

/// Marks the end of a request header block
pub const BOUNDARY: &[u8; 4] = b"\r\n\r\n";

/// Result of scanning the inbound view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// No boundary yet; more bytes are needed
    Incomplete,
    /// A full header block ends at `end` (exclusive, boundary included)
    Complete { end: usize },
}

/// First line of a request, borrowed from the inbound buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartLine<'a> {
    /// `None` when the method token is missing or not a valid token
    pub method: Option<Method>,
    /// `None` for anything but HTTP/1.0 and HTTP/1.1
    pub version: Option<Version>,
    pub target: &'a [u8],
    pub path: &'a [u8],
    pub query: &'a [u8],
}

impl<'a> StartLine<'a> {
    pub fn parse(line: &'a [u8]) -> Self {
        let mut parts = line.splitn(3, |&b| b == b' ');

        let method = parts
            .next()
            .filter(|token| !token.is_empty())
            .and_then(|token| Method::from_bytes(token).ok());
        let target = parts.next().unwrap_or_default();
        let version = match parts.next() {
            Some(b"HTTP/1.1") => Some(Version::HTTP_11),
            Some(b"HTTP/1.0") => Some(Version::HTTP_10),
            _ => None,
        };

        let (path, query) = match target.iter().position(|&b| b == b'?') {
            Some(at) => (&target[..at], &target[at + 1..]),
            None => (target, &target[target.len()..]),
        };

        Self {
            method,
            version,
            target,
            path,
            query,
        }
    }
}

/// Incremental request boundary parser
///
/// Only the start line is extracted. Header lines are scanned for the
/// boundary and, if the application asks for them, reported as raw slices.
///
/// The parser keeps a resume offset between `Incomplete` results, which is
/// only valid while the caller leaves the view's start unconsumed until a
/// `Complete` result.
#[derive(Debug, Default)]
pub struct RequestParser {
    scanned: usize,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `view` for the end of the next request header block
    ///
    /// On `Complete`, the start line (and headers, when wanted) has already
    /// been delivered to `application`. A multi-segment view is rejected with
    /// [`BenchError::MultiSegmentBuffer`](crate::BenchError::MultiSegmentBuffer).
    pub fn parse<A>(&mut self, view: &BufferView<'_>, application: &mut A) -> Result<ParseOutcome>
    where
        A: HttpApplication,
    {
        let buffer = view.contiguous()?;

        let from = self.scanned.min(buffer.len());
        let Some(at) = find_boundary(&buffer[from..]) else {
            // Keep the last three bytes in the next scan: they may start a split boundary.
            self.scanned = buffer.len().saturating_sub(BOUNDARY.len() - 1);
            return Ok(ParseOutcome::Incomplete);
        };
        self.scanned = 0;

        let head_end = from + at;
        let head = &buffer[..head_end];
        let (line, fields) = match find_crlf(head) {
            Some(at) => (&head[..at], &head[at + 2..]),
            None => (head, &head[head.len()..]),
        };

        application.on_start_line(&StartLine::parse(line));

        if A::WANTS_HEADERS && !fields.is_empty() {
            for field in fields.split(|&b| b == b'\n') {
                let field = field.strip_suffix(b"\r").unwrap_or(field);
                if let Some(colon) = field.iter().position(|&b| b == b':') {
                    application.on_header(field[..colon].trim_ascii(), field[colon + 1..].trim_ascii());
                }
            }
        }

        Ok(ParseOutcome::Complete {
            end: head_end + BOUNDARY.len(),
        })
    }
}

fn find_boundary(bytes: &[u8]) -> Option<usize> {
    bytes.windows(BOUNDARY.len()).position(|window| window == BOUNDARY)
}

fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|window| window == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::OutputPipe;

    #[derive(Default)]
    struct Recorder {
        lines: Vec<(Option<Method>, Vec<u8>, Vec<u8>)>,
    }

    impl HttpApplication for Recorder {
        fn on_start_line(&mut self, line: &StartLine<'_>) {
            self.lines
                .push((line.method.clone(), line.path.to_vec(), line.query.to_vec()));
        }

        fn process_request<O: OutputPipe>(&mut self, _output: &mut O) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct HeaderRecorder {
        headers: Vec<(Vec<u8>, Vec<u8>)>,
    }

    impl HttpApplication for HeaderRecorder {
        const WANTS_HEADERS: bool = true;

        fn on_start_line(&mut self, _line: &StartLine<'_>) {}

        fn on_header(&mut self, name: &[u8], value: &[u8]) {
            self.headers.push((name.to_vec(), value.to_vec()));
        }

        fn process_request<O: OutputPipe>(&mut self, _output: &mut O) -> Result<()> {
            Ok(())
        }
    }

    fn parse(parser: &mut RequestParser, bytes: &[u8], app: &mut Recorder) -> ParseOutcome {
        parser.parse(&BufferView::single(bytes), app).unwrap()
    }

    #[test]
    fn parse_simple_get() {
        let req = b"GET /plaintext HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let mut app = Recorder::default();

        let outcome = parse(&mut RequestParser::new(), req, &mut app);

        assert_eq!(outcome, ParseOutcome::Complete { end: req.len() });
        assert_eq!(app.lines, vec![(Some(Method::GET), b"/plaintext".to_vec(), Vec::new())]);
    }

    #[test]
    fn parse_empty_buffer_is_incomplete() {
        let mut app = Recorder::default();
        assert_eq!(parse(&mut RequestParser::new(), b"", &mut app), ParseOutcome::Incomplete);
        assert!(app.lines.is_empty());
    }

    #[test]
    fn parse_stops_at_first_boundary() {
        let req = b"GET /json HTTP/1.1\r\n\r\nGET /plaintext HTTP/1.1\r\n\r\n";
        let mut app = Recorder::default();

        let outcome = parse(&mut RequestParser::new(), req, &mut app);

        assert_eq!(outcome, ParseOutcome::Complete { end: 22 });
        assert_eq!(app.lines.len(), 1);
        assert_eq!(app.lines[0].1, b"/json");
    }

    #[test]
    fn parse_boundary_split_across_reads() {
        let mut parser = RequestParser::new();
        let mut app = Recorder::default();
        let full = b"GET /json?x=1 HTTP/1.1\r\nHost: x\r\n\r\n";

        for cut in [full.len() - 3, full.len() - 2, full.len() - 1] {
            assert_eq!(parse(&mut parser, &full[..cut], &mut app), ParseOutcome::Incomplete);
        }
        assert_eq!(
            parse(&mut parser, full, &mut app),
            ParseOutcome::Complete { end: full.len() }
        );
        assert_eq!(app.lines[0].1, b"/json");
        assert_eq!(app.lines[0].2, b"x=1");
    }

    #[test]
    fn parse_rejects_multi_segment_view() {
        let view = BufferView::from_segments([&b"GET / HTTP/1.1\r\n"[..], &b"\r\n"[..]]);
        let result = RequestParser::new().parse(&view, &mut Recorder::default());
        assert!(matches!(result, Err(crate::BenchError::MultiSegmentBuffer)));
    }

    #[test]
    fn parse_reports_headers_when_wanted() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\nAccept:  */*\r\n\r\n";
        let mut app = HeaderRecorder::default();

        RequestParser::new()
            .parse(&BufferView::single(req), &mut app)
            .unwrap();

        assert_eq!(
            app.headers,
            vec![
                (b"Host".to_vec(), b"example.com".to_vec()),
                (b"Accept".to_vec(), b"*/*".to_vec()),
            ]
        );
    }

    #[test]
    fn start_line_tolerates_garbage() {
        let line = StartLine::parse(b"");
        assert_eq!(line.method, None);
        assert_eq!(line.path, b"");
        assert_eq!(line.version, None);

        let line = StartLine::parse(b"BREW /pot HTCPCP/1.0");
        assert_eq!(line.method.as_ref().map(Method::as_str), Some("BREW"));
        assert_eq!(line.path, b"/pot");
        assert_eq!(line.version, None);

        let line = StartLine::parse(b"GET /json HTTP/1.0");
        assert_eq!(line.version, Some(Version::HTTP_10));
    }
}
