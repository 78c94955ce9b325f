//! Shared HTTP framing state machine. Finds header/body boundaries in a
//! byte buffer without building a full request/response object — both the
//! server and the client drive the same [`HttpParseState`] over whatever
//! bytes have arrived so far, byte-by-byte or all at once, with identical
//! results either way.

/// Outcome of feeding more bytes to the framer or a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerReaction {
    /// A complete message was parsed (and, for a session, responded to).
    Ok,
    /// Not enough bytes yet; call again once more have arrived.
    ReadOn,
    /// A response didn't correspond to a recognized token (client only).
    WrongReply,
    /// The connection must be closed after this exchange.
    Disconnect,
}

/// Scans for the header/body boundary of one HTTP message. `body_size`
/// starts at `-1` ("`Content-Length` not yet seen"); `transition` starts
/// at `0` ("no header yet parsed"). Both persist across calls so a
/// message can be fed incrementally.
#[derive(Debug, Clone, Copy)]
pub struct HttpParseState {
    transition: usize,
    body_size: i64,
}

impl Default for HttpParseState {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpParseState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            transition: 0,
            body_size: -1,
        }
    }

    pub fn reset(&mut self) {
        self.transition = 0;
        self.body_size = -1;
    }

    #[must_use]
    pub fn body_size(&self) -> i64 {
        self.body_size
    }

    #[must_use]
    pub fn header_end(&self) -> usize {
        self.transition
    }

    pub fn set_body_size(&mut self, size: i64) {
        self.body_size = size;
    }

    /// Scans `input` for the blank line ending the header block (`\r\n\r\n`).
    /// `first_line` receives the bytes up to (not including) the first
    /// `\r\n`; returning `false` aborts the connection. `header` is called
    /// once per `Name: Value` header line with the raw name/value bytes;
    /// `Content-Length` is intercepted internally to populate
    /// [`Self::body_size`] and is not passed to `header`.
    ///
    /// Returns `(ServerReaction::Ok, header_end_position)` once the header
    /// is fully parsed, or `(ServerReaction::ReadOn, consumed_so_far)` if
    /// more bytes are needed.
    pub fn parse(
        &mut self,
        input: &[u8],
        mut first_line: impl FnMut(&[u8]) -> bool,
        mut header: impl FnMut(&[u8], &[u8]),
    ) -> (ServerReaction, usize) {
        if input.len() < 4 {
            return (ServerReaction::ReadOn, 0);
        }
        while self.transition < 3
            || input[self.transition] != b'\n'
            || input[self.transition - 1] != b'\r'
            || input[self.transition - 2] != b'\n'
            || input[self.transition - 3] != b'\r'
        {
            if self.transition >= input.len() {
                return (ServerReaction::ReadOn, input.len());
            }
            self.transition += 1;
        }
        self.transition += 1;
        let header_end = self.transition;

        let mut position = 0usize;

        let (line_start, line_end) = read_word_until(input, &mut position, b'\r');
        if !first_line(&input[line_start..line_end]) {
            return (ServerReaction::Disconnect, input.len());
        }

        while position < header_end {
            position += 1; // the '\n' after '\r'
            let (name_start, name_end) = read_word_until(input, &mut position, b':');
            if name_start == name_end {
                break;
            }
            while position < input.len() && input[position] == b' ' {
                position += 1;
            }
            let (value_start, value_end) = read_word_until(input, &mut position, b'\r');
            let name = &input[name_start..name_end];
            let value = &input[value_start..value_end];
            if name == b"Content-Length" {
                if let Ok(text) = std::str::from_utf8(value) {
                    if let Ok(size) = text.trim().parse::<i64>() {
                        self.body_size = size;
                    }
                }
            } else {
                header(name, value);
            }
        }
        (ServerReaction::Ok, header_end)
    }
}

fn read_word_until(input: &[u8], position: &mut usize, separator: u8) -> (usize, usize) {
    let start = *position;
    while *position < input.len() && input[*position] != separator {
        *position += 1;
    }
    let end = *position;
    *position = (*position + 1).min(input.len());
    (start, end)
}
