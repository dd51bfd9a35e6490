//! Byte transport abstraction
//!
//! The connection loop never touches a socket directly. It pulls inbound bytes
//! through an [`InputPipe`] and composes outbound bytes inside regions lent by an
//! [`OutputPipe`]. Both sides are acknowledged explicitly:
//!
//! - inbound, with [`InputPipe::advance_to`], which says how much of the last
//!   view was *consumed* (may be reclaimed) and how much was merely *examined*
//!   (the pipe should not report itself ready again until new bytes arrive);
//! - outbound, with [`OutputPipe::advance`], which hands written bytes over to
//!   the transport for the next [`OutputPipe::flush`].

pub mod segmented;
pub mod stream;

#[cfg(test)]
mod tests;

pub use segmented::SegmentedInput;
pub use stream::{StreamInput, StreamOutput};

use crate::{BenchError, Result};
use smallvec::SmallVec;
use std::future::Future;

/// Outcome of a single [`InputPipe::read`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    /// The peer has finished sending; no further bytes will arrive
    pub is_completed: bool,
}

/// Read-only view over the bytes received but not yet consumed
///
/// A view may span several segments when the transport chains buffers
/// instead of compacting them.
#[derive(Debug, Clone, Default)]
pub struct BufferView<'a> {
    segments: SmallVec<[&'a [u8]; 2]>,
    len: usize,
}

impl<'a> BufferView<'a> {
    pub fn single(bytes: &'a [u8]) -> Self {
        let mut view = Self::default();
        view.push(bytes);
        view
    }

    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut view = Self::default();
        for segment in segments {
            view.push(segment);
        }
        view
    }

    fn push(&mut self, segment: &'a [u8]) {
        if !segment.is_empty() {
            self.len += segment.len();
            self.segments.push(segment);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_single_segment(&self) -> bool {
        self.segments.len() <= 1
    }

    /// The first segment, or an empty slice for an empty view
    pub fn first(&self) -> &'a [u8] {
        self.segments.first().copied().unwrap_or_default()
    }

    /// The whole view as one slice, if it is contiguous
    pub fn contiguous(&self) -> Result<&'a [u8]> {
        if self.is_single_segment() {
            Ok(self.first())
        } else {
            Err(BenchError::MultiSegmentBuffer)
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.segments.iter().copied()
    }
}

/// Inbound half of a byte transport
pub trait InputPipe: Send {
    /// Whether [`read`](Self::read) would resolve without waiting on the peer
    ///
    /// True when unexamined bytes are buffered or the stream has already ended.
    fn is_ready(&self) -> bool;

    /// Waits until unexamined bytes are buffered or the stream ends
    fn read(&mut self) -> impl Future<Output = Result<ReadResult>> + Send;

    /// Everything received and not yet consumed
    fn buffer(&self) -> BufferView<'_>;

    /// Acknowledges the last view
    ///
    /// Both offsets are relative to the start of [`buffer`](Self::buffer) and
    /// must satisfy `consumed <= examined <= buffer().len()`.
    fn advance_to(&mut self, consumed: usize, examined: usize);

    /// Finishes the read side, recording the error that ended it, if any
    fn complete(&mut self, error: Option<&BenchError>);
}

/// Outbound half of a byte transport
pub trait OutputPipe: Send {
    /// Returns a writable region of at least `size_hint` bytes (at least one
    /// byte when `size_hint` is zero)
    ///
    /// The region starts right after the last advanced byte. Asking for a
    /// larger region keeps the bytes already written into the current one.
    /// Contents beyond what is later passed to [`advance`](Self::advance) are
    /// discarded.
    fn get_span(&mut self, size_hint: usize) -> &mut [u8];

    /// Marks `count` bytes at the start of the current region as written
    fn advance(&mut self, count: usize);

    /// Sends every advanced byte to the peer
    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Flushes what is left and closes the write side
    ///
    /// Called exactly once per connection, on every exit path.
    fn complete(&mut self) -> impl Future<Output = ()> + Send;
}

pub(crate) fn check_advance(consumed: usize, examined: usize, len: usize) {
    assert!(
        consumed <= examined && examined <= len,
        "invalid advance: consumed {consumed}, examined {examined}, buffered {len}"
    );
}
