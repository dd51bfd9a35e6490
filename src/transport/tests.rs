use super::{BufferView, InputPipe, OutputPipe, SegmentedInput, StreamInput, StreamOutput};
use crate::BenchError;
use crate::performance::PooledBuffer;
use std::time::Duration;

fn input(reader: tokio_test::io::Mock) -> StreamInput<tokio_test::io::Mock> {
    StreamInput::new(reader, PooledBuffer::detached(64))
}

fn output(segment_size: usize) -> StreamOutput<Vec<u8>> {
    StreamOutput::new(Vec::new(), PooledBuffer::detached(64), segment_size)
}

#[test]
fn test_buffer_view_segments() {
    let empty = BufferView::default();
    assert!(empty.is_empty());
    assert!(empty.is_single_segment());
    assert_eq!(empty.first(), b"");

    let view = BufferView::from_segments([&b"GET /"[..], &b""[..], &b" HTTP/1.1"[..]]);
    assert_eq!(view.len(), 14);
    assert!(!view.is_single_segment());
    assert!(matches!(view.contiguous(), Err(BenchError::MultiSegmentBuffer)));
    assert_eq!(view.segments().count(), 2);
}

#[tokio::test]
async fn test_stream_input_accumulates_until_acknowledged() {
    let reader = tokio_test::io::Builder::new()
        .read(b"GET / HTTP/1.1\r\n")
        .read(b"\r\n")
        .build();
    let mut input = input(reader);

    assert!(!input.is_ready());
    let result = input.read().await.unwrap();
    assert!(!result.is_completed);
    assert_eq!(input.buffer().first(), b"GET / HTTP/1.1\r\n");

    // Everything examined, nothing consumed: the next read must wait for new bytes.
    input.advance_to(0, 16);
    assert!(!input.is_ready());

    input.read().await.unwrap();
    assert_eq!(input.buffer().first(), b"GET / HTTP/1.1\r\n\r\n");
    assert!(input.buffer().is_single_segment());

    input.advance_to(18, 18);
    assert!(input.buffer().is_empty());

    let result = input.read().await.unwrap();
    assert!(result.is_completed);
    assert!(input.buffer().is_empty());
}

#[tokio::test]
async fn test_stream_input_ready_with_unexamined_bytes() {
    let reader = tokio_test::io::Builder::new().read(b"abcdef").build();
    let mut input = input(reader);

    input.read().await.unwrap();
    input.advance_to(2, 4);
    assert!(input.is_ready());
    assert_eq!(input.buffer().first(), b"cdef");

    // Resolves immediately from the buffered bytes; the mock has nothing left to give.
    let result = input.read().await.unwrap();
    assert!(!result.is_completed);
    assert_eq!(input.buffer().len(), 4);
}

#[tokio::test]
#[should_panic(expected = "invalid advance")]
async fn test_stream_input_rejects_consumed_past_examined() {
    let reader = tokio_test::io::Builder::new().read(b"abcdef").build();
    let mut input = input(reader);
    input.read().await.unwrap();
    input.advance_to(4, 2);
}

#[tokio::test]
async fn test_stream_input_idle_timeout() {
    let (_peer, reader) = tokio::io::duplex(64);
    let mut input = StreamInput::new(reader, PooledBuffer::detached(64))
        .with_idle_timeout(Some(Duration::from_millis(20)));

    let result = input.read().await;
    assert!(matches!(result, Err(BenchError::Timeout(_))));
}

#[tokio::test]
async fn test_stream_input_records_fault() {
    let reader = tokio_test::io::Builder::new().build();
    let mut input = input(reader);

    input.complete(Some(&BenchError::UnexpectedEndOfData));
    assert!(input.is_completed());
    assert_eq!(input.fault(), Some("Unexpected end of data"));
}

#[tokio::test]
async fn test_stream_output_spans_grow_incrementally() {
    let mut output = output(4);

    let span = output.get_span(0);
    assert!(span.len() >= 4);
    span[..4].copy_from_slice(b"HTTP");
    output.advance(4);

    // A larger request than the remaining region yields a fresh region after the advanced bytes.
    let span = output.get_span(9);
    assert!(span.len() >= 9);
    span[..9].copy_from_slice(b"/1.1 200 ");
    output.advance(9);

    assert_eq!(output.pending(), b"HTTP/1.1 200 ");
}

#[tokio::test]
async fn test_stream_output_growth_keeps_unadvanced_bytes() {
    let mut output = output(4);

    output.get_span(0)[..4].copy_from_slice(b"HTTP");
    let span = output.get_span(8);
    assert_eq!(&span[..4], b"HTTP");
    span[4..8].copy_from_slice(b"/1.1");
    output.advance(8);

    assert_eq!(output.pending(), b"HTTP/1.1");
}

#[tokio::test]
async fn test_stream_output_flush_and_complete() {
    let mut output = output(16);

    output.flush().await.unwrap();
    assert_eq!(output.flushes(), 0);

    output.get_span(2)[..2].copy_from_slice(b"OK");
    output.advance(2);
    output.flush().await.unwrap();
    assert_eq!(output.flushes(), 1);
    assert!(output.pending().is_empty());
    assert_eq!(output.get_ref().as_slice(), b"OK");

    output.get_span(1)[0] = b'!';
    output.advance(1);
    output.complete().await;
    output.complete().await;

    assert!(output.is_closed());
    assert_eq!(output.get_ref().as_slice(), b"OK!");
    assert_eq!(output.flushes(), 2);
}

#[tokio::test]
#[should_panic(expected = "past the end")]
async fn test_stream_output_rejects_advance_past_region() {
    let mut output = output(4);
    let available = output.get_span(1).len();
    output.advance(available + 1);
}

#[tokio::test]
async fn test_segmented_input_keeps_chunks_apart() {
    let mut input = SegmentedInput::new([&b"GET / HT"[..], &b""[..], &b"TP/1.1\r\n\r\n"[..]]);

    input.read().await.unwrap();
    assert!(input.buffer().is_single_segment());
    input.advance_to(0, 8);

    input.read().await.unwrap();
    let view = input.buffer();
    assert_eq!(view.len(), 18);
    assert!(!view.is_single_segment());
    drop(view);

    input.advance_to(10, 18);
    let view = input.buffer();
    assert!(view.is_single_segment());
    assert_eq!(view.first(), b"/1.1\r\n\r\n");
    drop(view);

    input.advance_to(8, 8);
    let result = input.read().await.unwrap();
    assert!(result.is_completed);
    assert!(input.buffer().is_empty());
}
