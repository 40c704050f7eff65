//! The line framer: reassembles complete response messages (line plus any
//! embedded literals) from the raw byte stream.
//!
//! The framer alternates between two read modes. In line mode it collects
//! bytes until CRLF; if the completed line announces a literal with a
//! trailing `{N}`, it switches to byte mode and counts off exactly N
//! octets before resuming the same logical line. The position of the last
//! consumed announcement is remembered so a `{` earlier in the same line
//! cannot be mistaken for a second announcement.

use std::collections::VecDeque;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    /// Collect bytes until a complete CRLF-terminated line.
    Line,
    /// Pass through exactly this many literal octets.
    Bytes(usize),
}

/// Splits the inbound byte stream into complete response messages.
///
/// The maximum message size bounds how much a single response may
/// accumulate, so a peer that never terminates a line (or announces an
/// absurd literal) cannot grow the buffers without limit.
#[derive(Debug)]
pub struct Framer {
    /// Bytes received but not yet claimed by the current message.
    buffer: VecDeque<u8>,
    mode: ReadMode,
    /// The message being assembled, literals inline.
    current: Vec<u8>,
    /// Cursor just past the last literal; `{` before it is data, not an
    /// announcement.
    literal_scan_from: usize,
    /// Upper limit for one message, lines and literals combined.
    max_message_size: Option<usize>,
}

impl Framer {
    /// Creates a `Framer` with a maximum message size.
    pub fn new(max_message_size: usize) -> Self {
        Framer {
            buffer: VecDeque::new(),
            mode: ReadMode::Line,
            current: Vec::new(),
            literal_scan_from: 0,
            max_message_size: Some(max_message_size),
        }
    }

    /// Creates a `Framer` without a maximum message size. A peer can then
    /// allocate arbitrary amounts of memory by sending one huge message.
    pub fn without_max_message_size() -> Self {
        Framer {
            buffer: VecDeque::new(),
            mode: ReadMode::Line,
            current: Vec::new(),
            literal_scan_from: 0,
            max_message_size: None,
        }
    }

    /// Feeds bytes read from the transport.
    pub fn enqueue_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// True while a literal is only partially received.
    pub fn mid_literal(&self) -> bool {
        matches!(self.mode, ReadMode::Bytes(_))
    }

    /// Bytes buffered but not yet part of a complete message.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.current.len()
    }

    /// Assembles the next complete message, or returns `None` when more
    /// bytes are needed.
    pub fn progress(&mut self) -> Result<Option<Vec<u8>>, Error> {
        loop {
            match self.mode {
                ReadMode::Bytes(remaining) => {
                    let take = remaining.min(self.buffer.len());
                    self.current.extend(self.buffer.drain(..take));
                    self.check_limit(self.current.len())?;
                    if take < remaining {
                        self.mode = ReadMode::Bytes(remaining - take);
                        return Ok(None);
                    }
                    self.mode = ReadMode::Line;
                    self.literal_scan_from = self.current.len();
                }
                ReadMode::Line => {
                    let newline = match self.buffer.iter().position(|&b| b == b'\n') {
                        Some(position) => position,
                        None => {
                            // Without a newline every buffered byte still
                            // belongs to the current line.
                            self.check_limit(self.current.len() + self.buffer.len())?;
                            return Ok(None);
                        }
                    };
                    self.current.extend(self.buffer.drain(..=newline));
                    self.check_limit(self.current.len())?;

                    match self.literal_announcement()? {
                        Some(length) => {
                            // Fail announcements the limit can never fit
                            // instead of collecting the bytes first.
                            self.check_limit(self.current.len().saturating_add(length))?;
                            self.mode = ReadMode::Bytes(length);
                        }
                        None => {
                            self.literal_scan_from = 0;
                            return Ok(Some(std::mem::take(&mut self.current)));
                        }
                    }
                }
            }
        }
    }

    fn check_limit(&self, size: usize) -> Result<(), Error> {
        match self.max_message_size {
            Some(max) if size > max => Err(Error::TooMuchData {
                message: format!("message of {size} bytes exceeds the {max} byte limit"),
            }),
            _ => Ok(()),
        }
    }

    /// Checks whether the just-completed line ends in a `{N}` literal
    /// announcement and returns N.
    fn literal_announcement(&self) -> Result<Option<usize>, Error> {
        if !self.current.ends_with(b"}\r\n") {
            return Ok(None);
        }
        let body = &self.current[..self.current.len() - 3];
        let open = match body.iter().rposition(|&b| b == b'{') {
            Some(open) if open >= self.literal_scan_from => open,
            _ => return Ok(None),
        };

        let digits = &body[open + 1..];
        if digits.starts_with(b"-") {
            return Err(Error::parse(
                "negative literal length",
                &self.current,
                open + 1,
            ));
        }
        let text = std::str::from_utf8(digits)
            .ok()
            .filter(|t| !t.is_empty());
        match text.and_then(|t| t.parse::<u32>().ok()) {
            Some(length) => Ok(Some(length as usize)),
            None => Err(Error::parse(
                "unparseable literal length",
                &self.current,
                open + 1,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line() {
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* OK ready\r\n");
        assert_eq!(framer.progress().unwrap().unwrap(), b"* OK ready\r\n");
        assert!(framer.progress().unwrap().is_none());
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn literal_is_reassembled_into_one_message() {
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* 1 FETCH (RFC822.HEADER {5}\r\nabcde)\r\n");
        let message = framer.progress().unwrap().unwrap();
        assert_eq!(message, b"* 1 FETCH (RFC822.HEADER {5}\r\nabcde)\r\n");
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn literal_split_across_reads() {
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* 1 FETCH (BODY[] {10}\r\n");
        assert!(framer.progress().unwrap().is_none());
        assert!(framer.mid_literal());
        framer.enqueue_bytes(b"0123");
        assert!(framer.progress().unwrap().is_none());
        framer.enqueue_bytes(b"456789)\r\n");
        let message = framer.progress().unwrap().unwrap();
        assert_eq!(message, b"* 1 FETCH (BODY[] {10}\r\n0123456789)\r\n");
    }

    #[test]
    fn literal_contents_do_not_retrigger_announcements() {
        // The literal payload itself ends with "}\r\n"-looking bytes; the
        // scan cursor must ignore everything before the literal's end.
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* 1 FETCH (BODY[] {6}\r\nx{3}\r\n)\r\n");
        let message = framer.progress().unwrap().unwrap();
        assert_eq!(message, b"* 1 FETCH (BODY[] {6}\r\nx{3}\r\n)\r\n");
    }

    #[test]
    fn brace_text_without_announcement_is_a_plain_line() {
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* OK nothing here\r\n");
        assert!(framer.progress().unwrap().is_some());

        // No `{` at all, line just happens to end with `}`.
        framer.enqueue_bytes(b"* OK weird}\r\n");
        assert_eq!(framer.progress().unwrap().unwrap(), b"* OK weird}\r\n");
    }

    #[test]
    fn garbage_literal_length_is_an_error() {
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* OK {12x}\r\n");
        assert!(matches!(framer.progress(), Err(Error::Parse { .. })));

        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* OK {-5}\r\n");
        assert!(matches!(framer.progress(), Err(Error::Parse { .. })));
    }

    #[test]
    fn endless_line_hits_the_size_limit() {
        let mut framer = Framer::new(16);
        framer.enqueue_bytes(b"* OK a line that never ends and never ends");
        assert!(matches!(
            framer.progress(),
            Err(Error::TooMuchData { .. })
        ));
    }

    #[test]
    fn oversized_literal_announcement_fails_early() {
        let mut framer = Framer::new(64);
        framer.enqueue_bytes(b"* 1 FETCH (BODY[] {4096}\r\n");
        assert!(matches!(
            framer.progress(),
            Err(Error::TooMuchData { .. })
        ));
    }

    #[test]
    fn small_messages_pass_under_the_limit() {
        let mut framer = Framer::new(32);
        framer.enqueue_bytes(b"* 3 EXISTS\r\n* 1 RECENT\r\n* 2 EXPUNGE\r\n");
        assert_eq!(framer.progress().unwrap().unwrap(), b"* 3 EXISTS\r\n");
        assert_eq!(framer.progress().unwrap().unwrap(), b"* 1 RECENT\r\n");
        assert_eq!(framer.progress().unwrap().unwrap(), b"* 2 EXPUNGE\r\n");
    }

    #[test]
    fn two_messages_in_one_read() {
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* 3 EXISTS\r\n* 1 RECENT\r\n");
        assert_eq!(framer.progress().unwrap().unwrap(), b"* 3 EXISTS\r\n");
        assert_eq!(framer.progress().unwrap().unwrap(), b"* 1 RECENT\r\n");
        assert!(framer.progress().unwrap().is_none());
    }

    #[test]
    fn multiple_literals_in_one_response() {
        let mut framer = Framer::without_max_message_size();
        framer.enqueue_bytes(b"* 1 FETCH (BODY[1] {2}\r\nab BODY[2] {3}\r\ncde)\r\n");
        let message = framer.progress().unwrap().unwrap();
        assert_eq!(
            message,
            b"* 1 FETCH (BODY[1] {2}\r\nab BODY[2] {3}\r\ncde)\r\n"
        );
    }
}
