//! Fixed-capacity single-line buffer for helper pipes.

/// Accumulates pipe output until a newline.
///
/// The buffer never grows past [`LineBuffer::CAPACITY`] bytes; callers read at
/// most [`room`](Self::room) bytes at a time and treat a full buffer without a
/// newline as an overflow.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub const CAPACITY: usize = 256;

    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(Self::CAPACITY),
        }
    }

    /// Bytes that can still be appended.
    #[must_use]
    pub fn room(&self) -> usize {
        Self::CAPACITY - self.buf.len()
    }

    /// Full and still without a newline.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.room() == 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append `bytes`, truncated to the remaining room.
    pub fn push(&mut self, bytes: &[u8]) {
        let take = bytes.len().min(self.room());
        self.buf.extend_from_slice(&bytes[..take]);
    }

    /// Remove and return the first complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
