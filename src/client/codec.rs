use crate::{BenchError, Result};
use bytes::{Buf, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, HeaderName, HeaderValue};
use http::{Response, StatusCode, Version};
use tokio_util::codec::Decoder;

const MAX_HEADERS: usize = 32;

/// Frames HTTP/1.x responses by `Content-Length`
///
/// Responses without a `Content-Length` header are taken to have no body,
/// which is what the benchmark server always sends for its fallback route.
#[derive(Debug, Clone)]
pub struct ResponseCodec {
    max_response_size: usize,
}

impl ResponseCodec {
    pub fn new(max_response_size: usize) -> Self {
        Self { max_response_size }
    }
}

impl Default for ResponseCodec {
    fn default() -> Self {
        Self::new(1024 * 1024)
    }
}

struct Head {
    status: StatusCode,
    version: Version,
    headers: Vec<(HeaderName, HeaderValue)>,
    header_len: usize,
    content_length: usize,
}

fn parse_head(src: &[u8]) -> Result<Option<Head>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    let header_len = match response.parse(src) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(BenchError::InvalidResponse(format!("malformed response head: {e}"))),
    };

    let code = response
        .code
        .ok_or_else(|| BenchError::InvalidResponse("missing status code".to_string()))?;
    let status = StatusCode::from_u16(code)
        .map_err(|e| BenchError::InvalidResponse(format!("bad status code {code}: {e}")))?;
    let version = match response.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut content_length = 0;
    let mut owned = Vec::with_capacity(response.headers.len());
    for header in response.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| BenchError::InvalidResponse(format!("bad header name: {e}")))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|e| BenchError::InvalidResponse(format!("bad header value: {e}")))?;

        if name == CONTENT_LENGTH {
            content_length = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| BenchError::InvalidResponse(format!("bad Content-Length: {value:?}")))?;
        }
        owned.push((name, value));
    }

    Ok(Some(Head {
        status,
        version,
        headers: owned,
        header_len,
        content_length,
    }))
}

impl Decoder for ResponseCodec {
    type Item = Response<Bytes>;
    type Error = BenchError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some(head) = parse_head(src)? else {
            if src.len() > self.max_response_size {
                return Err(BenchError::InvalidResponse(format!(
                    "response head exceeds {} bytes",
                    self.max_response_size
                )));
            }
            return Ok(None);
        };

        let total = head.header_len + head.content_length;
        if total > self.max_response_size {
            return Err(BenchError::InvalidResponse(format!(
                "response of {total} bytes exceeds {} bytes",
                self.max_response_size
            )));
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(head.header_len);
        let body = src.split_to(head.content_length).freeze();

        let mut response = Response::new(body);
        *response.status_mut() = head.status;
        *response.version_mut() = head.version;
        let headers = response.headers_mut();
        for (name, value) in head.headers {
            headers.append(name, value);
        }
        Ok(Some(response))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(response) => Ok(Some(response)),
            None if src.is_empty() => Ok(None),
            None => Err(BenchError::UnexpectedEndOfData),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAINTEXT: &[u8] = b"HTTP/1.1 200 OK\r\nServer: Custom\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\nHello, World!";

    #[test]
    fn test_decode_complete_response() {
        let mut codec = ResponseCodec::default();
        let mut src = BytesMut::from(PLAINTEXT);

        let response = codec.decode(&mut src).unwrap().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.version(), Version::HTTP_11);
        assert_eq!(response.headers()["server"], "Custom");
        assert_eq!(response.body().as_ref(), b"Hello, World!");
        assert!(src.is_empty());
    }

    #[test]
    fn test_decode_waits_for_body() {
        let mut codec = ResponseCodec::default();
        let mut src = BytesMut::from(&PLAINTEXT[..PLAINTEXT.len() - 3]);

        assert!(codec.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(b"ld!");
        assert!(codec.decode(&mut src).unwrap().is_some());
    }

    #[test]
    fn test_decode_pipelined_responses() {
        let mut codec = ResponseCodec::default();
        let mut src = BytesMut::new();
        src.extend_from_slice(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        src.extend_from_slice(PLAINTEXT);

        let first = codec.decode(&mut src).unwrap().unwrap();
        let second = codec.decode(&mut src).unwrap().unwrap();

        assert!(first.body().is_empty());
        assert_eq!(second.body().as_ref(), b"Hello, World!");
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_truncated_response_at_eof() {
        let mut codec = ResponseCodec::default();
        let mut src = BytesMut::from(&PLAINTEXT[..20]);

        assert!(matches!(codec.decode_eof(&mut src), Err(BenchError::UnexpectedEndOfData)));
    }

    #[test]
    fn test_malformed_and_oversized_responses() {
        let mut codec = ResponseCodec::default();
        let mut src = BytesMut::from(&b"HTTP/1.1 abc OK\r\n\r\n"[..]);
        assert!(matches!(codec.decode(&mut src), Err(BenchError::InvalidResponse(_))));

        let mut codec = ResponseCodec::new(64);
        let mut src = BytesMut::from(PLAINTEXT);
        assert!(matches!(codec.decode(&mut src), Err(BenchError::InvalidResponse(_))));
    }
}
