//! Streaming byte-queue contract between the protocol engine and its transport
//!
//! The engine never talks to a socket. It appends framed request bytes to an
//! outbound queue and consumes reply bytes from an inbound queue; the host's
//! event loop moves bytes between the queues and the wire. Partial data is the
//! normal case on the read side, so every consuming operation either succeeds
//! completely or reports that not enough bytes are buffered.

use std::collections::VecDeque;
use std::fmt;

/// Byte queue the protocol engine reads from and writes to.
///
/// All operations are synchronous and non-suspending. `read` and `drain`
/// expect the caller to have checked `len()` first; a line that has not fully
/// arrived is reported by `readln` returning `None`.
pub trait ByteBuffer {
    /// Append raw bytes to the tail of the queue.
    fn append(&mut self, bytes: &[u8]);

    /// Append formatted text to the tail of the queue, returning the number
    /// of bytes written.
    fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> usize;

    /// Remove and return one CRLF-terminated line, without the terminator.
    ///
    /// The terminator is strict `\r\n`; a bare `\n` does not end a line.
    /// Returns `None` when no complete line is buffered (nothing is consumed).
    fn readln(&mut self) -> Option<Vec<u8>>;

    /// Number of buffered bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return exactly `n` bytes. The caller must have verified
    /// `len() >= n`.
    fn read(&mut self, n: usize) -> Vec<u8>;

    /// Discard exactly `n` bytes. The caller must have verified `len() >= n`.
    fn drain(&mut self, n: usize);
}

/// In-memory `ByteBuffer` backed by a `VecDeque<u8>`.
///
/// This is the implementation used by the test suite and by hosts that do
/// their own socket I/O and just need a staging queue.
#[derive(Debug, Default)]
pub struct MemBuffer {
    data: VecDeque<u8>,
}

impl MemBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: VecDeque::with_capacity(capacity) }
    }

    /// Borrow the buffered bytes as one contiguous slice.
    pub fn as_slice(&mut self) -> &[u8] {
        self.data.make_contiguous()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl ByteBuffer for MemBuffer {
    fn append(&mut self, bytes: &[u8]) {
        self.data.extend(bytes);
    }

    fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> usize {
        let text = args.to_string();
        self.data.extend(text.as_bytes());
        text.len()
    }

    fn readln(&mut self) -> Option<Vec<u8>> {
        let contiguous = self.data.make_contiguous();
        let pos = contiguous.windows(2).position(|w| w == b"\r\n")?;
        let line: Vec<u8> = self.data.drain(..pos).collect();
        self.data.drain(..2);
        Some(line)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn read(&mut self, n: usize) -> Vec<u8> {
        debug_assert!(n <= self.data.len());
        self.data.drain(..n).collect()
    }

    fn drain(&mut self, n: usize) {
        debug_assert!(n <= self.data.len());
        self.data.drain(..n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readln_strict_crlf() {
        let mut buf = MemBuffer::new();
        buf.append(b"hello\nworld\r\n");
        // the bare \n is part of the line, not a terminator
        assert_eq!(buf.readln().unwrap(), b"hello\nworld");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_readln_partial_line() {
        let mut buf = MemBuffer::new();
        buf.append(b"+OK");
        assert_eq!(buf.readln(), None);
        assert_eq!(buf.len(), 3); // nothing consumed

        buf.append(b"\r\n");
        assert_eq!(buf.readln().unwrap(), b"+OK");
    }

    #[test]
    fn test_readln_split_terminator() {
        let mut buf = MemBuffer::new();
        buf.append(b"END\r");
        assert_eq!(buf.readln(), None);
        buf.append(b"\n");
        assert_eq!(buf.readln().unwrap(), b"END");
    }

    #[test]
    fn test_read_and_drain() {
        let mut buf = MemBuffer::new();
        buf.append(b"abcdef");
        assert_eq!(buf.read(3), b"abc");
        buf.drain(2);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.read(1), b"f");
    }

    #[test]
    fn test_append_fmt_returns_byte_count() {
        let mut buf = MemBuffer::new();
        let n = buf.append_fmt(format_args!("${}\r\n", 1234));
        assert_eq!(n, 7);
        assert_eq!(buf.len(), 7);
        assert_eq!(buf.as_slice(), b"$1234\r\n");
    }

    #[test]
    fn test_empty_line() {
        let mut buf = MemBuffer::new();
        buf.append(b"\r\nrest");
        assert_eq!(buf.readln().unwrap(), b"");
        assert_eq!(buf.len(), 4);
    }
}
