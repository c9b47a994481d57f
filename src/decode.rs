//! Stream decoding: bytes to complete lines, or to a terminated payload.
//!
//! One `Decoder` owns the connection buffer and a mode tag. In line mode
//! it yields CRLF-terminated lines; in payload mode it accumulates raw
//! bytes until the buffer ends with the payload terminator. Both
//! terminators may arrive split across any number of reads.

use bytes::BytesMut;

/// Line terminator for commands and replies.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Payload terminator: CRLF, a dot, CRLF.
pub const PAYLOAD_TERMINATOR: &[u8] = b"\r\n.\r\n";

/// How incoming bytes are currently interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// CRLF-delimited command lines.
    Line,
    /// Opaque body bytes until the payload terminator.
    Payload,
}

/// One complete unit extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A command line, terminator stripped.
    Line(Vec<u8>),
    /// A captured payload, terminator stripped.
    Payload(Vec<u8>),
}

/// Incremental decoder over one connection's byte stream.
#[derive(Debug)]
pub struct Decoder {
    buffer: BytesMut,
    mode: DecodeMode,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            buffer: BytesMut::with_capacity(4096),
            mode: DecodeMode::Line,
        }
    }

    /// Append newly received bytes to the connection buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Switch interpretation of subsequent buffer content. Bytes already
    /// buffered are re-examined under the new mode on the next `decode`.
    pub fn set_mode(&mut self, mode: DecodeMode) {
        self.mode = mode;
    }

    /// Bytes currently held waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Extract the next complete unit, if the buffer holds one.
    ///
    /// Returns `None` when more bytes are needed; a partial terminator
    /// is always retained for the next arrival.
    pub fn decode(&mut self) -> Option<Decoded> {
        match self.mode {
            DecodeMode::Line => {
                let pos = find_crlf(&self.buffer)?;
                let mut line = self.buffer.split_to(pos + LINE_TERMINATOR.len());
                line.truncate(pos);
                Some(Decoded::Line(line.to_vec()))
            }
            DecodeMode::Payload => {
                // The terminator may straddle reads, so the check runs
                // against the suffix of the cumulative buffer. Embedded
                // occurrences that are not the suffix never match.
                if self.buffer.ends_with(PAYLOAD_TERMINATOR) {
                    let body_len = self.buffer.len() - PAYLOAD_TERMINATOR.len();
                    let body = self.buffer.split_to(body_len).to_vec();
                    self.buffer.clear();
                    Some(Decoded::Payload(body))
                } else {
                    None
                }
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Find \r\n in the buffer, returning the position of \r.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    (0..buffer.len().saturating_sub(1)).find(|&i| buffer[i] == b'\r' && buffer[i + 1] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_from_chunks(chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut decoder = Decoder::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            decoder.feed(chunk);
            while let Some(Decoded::Line(line)) = decoder.decode() {
                lines.push(line);
            }
        }
        lines
    }

    #[test]
    fn test_single_line() {
        assert_eq!(lines_from_chunks(&[b"USER admin\r\n"]), vec![b"USER admin".to_vec()]);
    }

    #[test]
    fn test_multiple_lines_one_read() {
        let lines = lines_from_chunks(&[b"USER admin\r\nPASS password\r\n"]);
        assert_eq!(lines, vec![b"USER admin".to_vec(), b"PASS password".to_vec()]);
    }

    #[test]
    fn test_terminator_split_across_reads() {
        let lines = lines_from_chunks(&[b"QUIT\r", b"\n"]);
        assert_eq!(lines, vec![b"QUIT".to_vec()]);
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let input = b"USER admin\r\nPASS password\r\nQUIT\r\n";
        let whole = lines_from_chunks(&[input]);

        // Byte at a time
        let chunks: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(lines_from_chunks(&chunks), whole);

        // Every split point
        for split in 1..input.len() {
            let (a, b) = input.split_at(split);
            assert_eq!(lines_from_chunks(&[a, b]), whole, "split at {split}");
        }
    }

    #[test]
    fn test_empty_line_yielded() {
        assert_eq!(lines_from_chunks(&[b"\r\n"]), vec![Vec::new()]);
    }

    #[test]
    fn test_incomplete_line_retained() {
        let mut decoder = Decoder::new();
        decoder.feed(b"USER adm");
        assert_eq!(decoder.decode(), None);
        assert_eq!(decoder.buffered(), 8);
        decoder.feed(b"in\r\n");
        assert_eq!(decoder.decode(), Some(Decoded::Line(b"USER admin".to_vec())));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_payload_single_read() {
        let mut decoder = Decoder::new();
        decoder.set_mode(DecodeMode::Payload);
        decoder.feed(b"Subject: hi\r\n\r\nbody\r\n.\r\n");
        assert_eq!(
            decoder.decode(),
            Some(Decoded::Payload(b"Subject: hi\r\n\r\nbody".to_vec()))
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_payload_terminator_split_every_way() {
        let input = b"hello world\r\n.\r\n";
        // Split the terminator across 1..=5 chunk boundaries.
        for split in input.len() - PAYLOAD_TERMINATOR.len()..input.len() {
            let mut decoder = Decoder::new();
            decoder.set_mode(DecodeMode::Payload);
            decoder.feed(&input[..split]);
            assert_eq!(decoder.decode(), None, "premature yield at split {split}");
            decoder.feed(&input[split..]);
            assert_eq!(
                decoder.decode(),
                Some(Decoded::Payload(b"hello world".to_vec())),
                "split at {split}"
            );
        }
    }

    #[test]
    fn test_payload_embedded_terminator_not_suffix() {
        let mut decoder = Decoder::new();
        decoder.set_mode(DecodeMode::Payload);
        decoder.feed(b"first\r\n.\r\nsecond");
        assert_eq!(decoder.decode(), None);
        decoder.feed(b"\r\n.\r\n");
        assert_eq!(
            decoder.decode(),
            Some(Decoded::Payload(b"first\r\n.\r\nsecond".to_vec()))
        );
    }

    #[test]
    fn test_payload_byte_at_a_time() {
        let mut decoder = Decoder::new();
        decoder.set_mode(DecodeMode::Payload);
        for &b in b"x\r\n.\r\n" {
            assert_eq!(decoder.decode(), None);
            decoder.feed(&[b]);
        }
        assert_eq!(decoder.decode(), Some(Decoded::Payload(b"x".to_vec())));
    }

    #[test]
    fn test_mode_switch_keeps_buffered_bytes() {
        // Bytes after the DATA line in the same read belong to the payload.
        let mut decoder = Decoder::new();
        decoder.feed(b"DATA\r\nbody\r\n.\r\n");
        assert_eq!(decoder.decode(), Some(Decoded::Line(b"DATA".to_vec())));
        decoder.set_mode(DecodeMode::Payload);
        assert_eq!(decoder.decode(), Some(Decoded::Payload(b"body".to_vec())));
    }
}
