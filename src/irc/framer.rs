use bytes::BytesMut;

const CRLF: &[u8] = b"\r\n";

/// Accumulates socket reads and yields complete CRLF-terminated lines.
///
/// Partial trailing data stays buffered until the rest of the line arrives.
/// A fresh framer is created for every connection.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: BytesMut,
    /// Bytes already scanned without finding a delimiter.
    scanned: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, in order,
    /// with the delimiter stripped. Invalid UTF-8 is replaced rather than
    /// dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }
        lines
    }

    /// Bytes held for a line that has not been terminated yet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn next_line(&mut self) -> Option<String> {
        // A '\r' at the end of the previous scan may pair with a new '\n'.
        let start = self.scanned.saturating_sub(1);
        match self.buffer[start..]
            .windows(CRLF.len())
            .position(|window| window == CRLF)
        {
            Some(offset) => {
                let end = start + offset;
                let line = self.buffer.split_to(end + CRLF.len());
                self.scanned = 0;
                Some(String::from_utf8_lossy(&line[..end]).into_owned())
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }
}
