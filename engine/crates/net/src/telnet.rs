const IAC: u8 = 255;
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const DONT: u8 = 254;
const SB: u8 = 250;
const SE: u8 = 240;

pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Strip Telnet IAC sequences from raw bytes. An unfinished sequence at
/// the end is dropped.
pub fn strip_iac(bytes: &[u8]) -> Vec<u8> {
    split_iac(bytes).0
}

/// Strip complete IAC sequences. Also returns the length of an unfinished
/// sequence at the end of `bytes`, which is left out of the text.
fn split_iac(bytes: &[u8]) -> (Vec<u8>, usize) {
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != IAC {
            result.push(bytes[i]);
            i += 1;
            continue;
        }
        let Some(&command) = bytes.get(i + 1) else {
            return (result, bytes.len() - i);
        };
        let len = match command {
            WILL | WONT | DO | DONT => 3,
            SB => {
                let body = &bytes[i + 2..];
                match body.windows(2).position(|w| w == [IAC, SE]) {
                    Some(end) => 2 + end + 2,
                    None => return (result, bytes.len() - i),
                }
            }
            IAC => {
                result.push(IAC);
                2
            }
            _ => 2,
        };
        if i + len > bytes.len() {
            return (result, bytes.len() - i);
        }
        i += len;
    }

    (result, 0)
}

/// One framed unit of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Line(String),
    /// A line longer than the limit was received and discarded. Carries the
    /// number of bytes seen.
    Oversized(usize),
}

/// Splits a telnet byte stream into lines on LF, ignoring CR.
pub struct LineBuffer {
    buf: Vec<u8>,
    max_len: usize,
    overflow: usize,
    /// Start of an IAC sequence cut off by the end of the last read.
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
            overflow: 0,
            pending: Vec::new(),
        }
    }

    /// Feed raw data into the buffer. Returns any completed lines.
    pub fn feed(&mut self, data: &[u8]) -> Vec<LineEvent> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(data);
        let (cleaned, unfinished) = split_iac(&input);
        // A subnegotiation that never ends is dropped rather than buffered.
        if unfinished <= self.max_len {
            self.pending = input[input.len() - unfinished..].to_vec();
        }
        let mut events = Vec::new();

        for &byte in &cleaned {
            match byte {
                b'\n' => events.push(self.take_line()),
                b'\r' => {}
                _ if self.overflow > 0 => self.overflow += 1,
                _ if self.buf.len() >= self.max_len => {
                    self.overflow = self.buf.len() + 1;
                    self.buf.clear();
                }
                _ => self.buf.push(byte),
            }
        }

        events
    }

    fn take_line(&mut self) -> LineEvent {
        if self.overflow > 0 {
            let seen = std::mem::take(&mut self.overflow);
            return LineEvent::Oversized(seen);
        }
        let bytes = std::mem::take(&mut self.buf);
        LineEvent::Line(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
