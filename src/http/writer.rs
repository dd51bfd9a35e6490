use crate::transport::OutputPipe;
use std::io;

/// Composes response bytes directly inside the output pipe's regions
///
/// Bytes are written into the current region and handed over to the pipe
/// only on [`commit`](Self::commit). Anything written but not committed when
/// the writer is dropped is discarded.
pub struct BufferWriter<'a, O: OutputPipe> {
    output: &'a mut O,
    buffered: usize,
}

impl<'a, O: OutputPipe> BufferWriter<'a, O> {
    pub fn new(output: &'a mut O) -> Self {
        Self { output, buffered: 0 }
    }

    /// Bytes written since the last commit
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    pub fn write(&mut self, mut source: &[u8]) {
        while !source.is_empty() {
            let free = self.output.get_span(0).len() - self.buffered;
            if free == 0 {
                self.grow(source.len());
                continue;
            }

            let count = free.min(source.len());
            let span = self.output.get_span(0);
            span[self.buffered..self.buffered + count].copy_from_slice(&source[..count]);
            self.buffered += count;
            source = &source[count..];
        }
    }

    /// Writes `value` in ASCII decimal, without leading zeros
    pub fn write_numeric(&mut self, value: u64) {
        // u64::MAX has 20 digits
        let mut digits = [0u8; 20];
        let mut at = digits.len();
        let mut rest = value;
        loop {
            at -= 1;
            digits[at] = b'0' + (rest % 10) as u8;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        self.write(&digits[at..]);
    }

    /// Hands every buffered byte over to the output pipe
    pub fn commit(&mut self) {
        if self.buffered > 0 {
            self.output.advance(self.buffered);
            self.buffered = 0;
        }
    }

    /// Widens the current region, keeping the bytes buffered in it
    fn grow(&mut self, count: usize) {
        self.output.get_span(self.buffered + count);
    }
}

impl<O: OutputPipe> io::Write for BufferWriter<'_, O> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferWriter::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
