use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::VecDeque;

pub const LINE_DELIMITER: &[u8] = b"\r\n";

/// FIFO of outbound lines, each already terminated with CRLF.
///
/// The queue never performs I/O itself. `enqueue` and `on_write_complete`
/// report whether the caller has to start a send of the current front, which
/// keeps at most one write outstanding on the socket.
#[derive(Debug, Default)]
pub struct WriteQueue {
    pending: VecDeque<Bytes>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` followed by CRLF. Returns `true` if the queue was idle,
    /// i.e. no write is in flight and the new front has to be sent now.
    pub fn enqueue(&mut self, line: &str) -> bool {
        let was_idle = self.pending.is_empty();
        let mut buf = BytesMut::with_capacity(line.len() + LINE_DELIMITER.len());
        buf.put_slice(line.as_bytes());
        buf.put_slice(LINE_DELIMITER);
        self.pending.push_back(buf.freeze());
        was_idle
    }

    /// Bytes of the element currently being sent.
    pub fn front(&self) -> Option<&[u8]> {
        self.pending.front().map(|buf| buf.as_ref())
    }

    /// Acknowledges `bytes_written` bytes of the front element. The count is
    /// clamped to what remains of the front, so a partial write never eats
    /// into the next line. Returns `true` if another send has to be started.
    pub fn on_write_complete(&mut self, bytes_written: usize) -> bool {
        let Some(front) = self.pending.front_mut() else {
            return false;
        };
        let consumed = bytes_written.min(front.len());
        front.advance(consumed);
        if front.is_empty() {
            self.pending.pop_front();
        }
        !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drains the queue the way the connection does, acknowledging at most
    /// `chunk` bytes per completed write.
    fn drain_with_chunk(queue: &mut WriteQueue, chunk: usize) -> Vec<u8> {
        let mut wire = Vec::new();
        while let Some(front) = queue.front() {
            let written = front.len().min(chunk);
            wire.extend_from_slice(&front[..written]);
            queue.on_write_complete(written);
        }
        wire
    }

    #[test]
    fn test_enqueue_signals_send_only_when_idle() {
        let mut queue = WriteQueue::new();
        assert!(queue.enqueue("PASS oauth:abc"));
        assert!(!queue.enqueue("NICK bot"));
        assert!(!queue.enqueue("CAP REQ :twitch.tv/tags"));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.front(), Some(&b"PASS oauth:abc\r\n"[..]));
    }

    #[test]
    fn test_full_write_pops_front_and_requests_next_send() {
        let mut queue = WriteQueue::new();
        queue.enqueue("NICK bot");
        queue.enqueue("JOIN #foo");

        assert!(queue.on_write_complete(b"NICK bot\r\n".len()));
        assert_eq!(queue.front(), Some(&b"JOIN #foo\r\n"[..]));

        assert!(!queue.on_write_complete(b"JOIN #foo\r\n".len()));
        assert!(queue.is_empty());
        assert!(queue.enqueue("PRIVMSG #foo :hi"), "idle queue must restart sending");
    }

    #[test]
    fn test_partial_write_keeps_remainder_at_front() {
        let mut queue = WriteQueue::new();
        queue.enqueue("NICK bot");

        assert!(queue.on_write_complete(4));
        assert_eq!(queue.front(), Some(&b" bot\r\n"[..]));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_oversized_ack_is_clamped_to_front() {
        let mut queue = WriteQueue::new();
        queue.enqueue("A");
        queue.enqueue("B");

        assert!(queue.on_write_complete(100));
        assert_eq!(queue.front(), Some(&b"B\r\n"[..]));
    }

    #[test]
    fn test_zero_byte_ack_changes_nothing() {
        let mut queue = WriteQueue::new();
        queue.enqueue("A");

        assert!(queue.on_write_complete(0));
        assert_eq!(queue.front(), Some(&b"A\r\n"[..]));
    }

    #[test]
    fn test_ack_on_empty_queue_is_noop() {
        let mut queue = WriteQueue::new();
        assert!(!queue.on_write_complete(10));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wire_bytes_match_enqueue_order_for_any_split() {
        let lines = [
            "PASS oauth:abc",
            "NICK bot",
            "CAP REQ :twitch.tv/tags",
            "JOIN #foo",
            "PRIVMSG #foo :hello there",
            "",
        ];
        let expected: Vec<u8> = lines
            .iter()
            .flat_map(|line| format!("{}\r\n", line).into_bytes())
            .collect();

        for chunk in 1..=expected.len() {
            let mut queue = WriteQueue::new();
            for line in &lines {
                queue.enqueue(line);
            }
            assert_eq!(drain_with_chunk(&mut queue, chunk), expected, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_enqueue_interleaved_with_acks_preserves_order() {
        let mut queue = WriteQueue::new();
        let mut wire = Vec::new();

        queue.enqueue("first");
        let front = queue.front().map(<[u8]>::to_vec).unwrap_or_default();
        wire.extend_from_slice(&front[..3]);
        queue.on_write_complete(3);

        queue.enqueue("second");
        wire.extend(drain_with_chunk(&mut queue, 2));
        queue.enqueue("third");
        wire.extend(drain_with_chunk(&mut queue, 64));

        assert_eq!(wire, b"first\r\nsecond\r\nthird\r\n");
    }
}
