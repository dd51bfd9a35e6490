use super::{BufferView, InputPipe, ReadResult, check_advance};
use crate::{BenchError, Result};
use bytes::{Buf, Bytes};
use std::collections::VecDeque;

/// Scripted in-memory input that chains segments instead of compacting them
///
/// Each scripted chunk is delivered by one read and kept as its own segment, so
/// a request whose bytes arrive in two chunks is seen as a two-segment view.
/// Used to replay captured traffic and to drive the multi-segment path.
#[derive(Debug, Default)]
pub struct SegmentedInput {
    script: VecDeque<Bytes>,
    segments: VecDeque<Bytes>,
    examined: usize,
    eof: bool,
    fault: Option<String>,
}

impl SegmentedInput {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            script: chunks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn buffered(&self) -> usize {
        self.segments.iter().map(Bytes::len).sum()
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }
}

impl InputPipe for SegmentedInput {
    fn is_ready(&self) -> bool {
        self.eof || self.examined < self.buffered()
    }

    async fn read(&mut self) -> Result<ReadResult> {
        while !self.is_ready() {
            match self.script.pop_front() {
                Some(chunk) if chunk.is_empty() => {}
                Some(chunk) => self.segments.push_back(chunk),
                None => self.eof = true,
            }
        }

        Ok(ReadResult {
            is_completed: self.eof,
        })
    }

    fn buffer(&self) -> BufferView<'_> {
        BufferView::from_segments(self.segments.iter().map(|segment| &segment[..]))
    }

    fn advance_to(&mut self, consumed: usize, examined: usize) {
        check_advance(consumed, examined, self.buffered());

        let mut remaining = consumed;
        while remaining > 0 {
            let Some(front) = self.segments.front_mut() else {
                break;
            };
            if front.len() <= remaining {
                remaining -= front.len();
                self.segments.pop_front();
            } else {
                front.advance(remaining);
                remaining = 0;
            }
        }
        self.examined = examined - consumed;
    }

    fn complete(&mut self, error: Option<&BenchError>) {
        self.fault = error.map(ToString::to_string);
    }
}
