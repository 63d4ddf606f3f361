//! Serial command transport.
//!
//! Wire format: one JSON command document per line.
//! ```text
//! {"commands":[{"command":"PING"}]}\n
//! ```
//!
//! [`LineFramer`] accumulates incoming bytes and yields complete lines.
//! A line longer than [`MAX_LINE_LEN`] is discarded in full (up to and
//! including its terminator) rather than truncated into something that
//! might still parse.  `\r\n` endings are accepted.
//!
//! [`ConsoleReply`] is the outbound side: replies go to the console the
//! host tool is reading from.

use log::warn;
use serde_json::Value;

use crate::app::ports::ReplyPort;

/// Longest accepted command line, terminator excluded.
pub const MAX_LINE_LEN: usize = 1024;

/// Streaming newline framer.
pub struct LineFramer {
    buf: heapless::Vec<u8, MAX_LINE_LEN>,
    /// The current line overflowed and is being skipped.
    discarding: bool,
    /// `buf` holds a line already handed out; clear on the next byte.
    complete: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            discarding: false,
            complete: false,
        }
    }

    /// Feed one byte.
    ///
    /// Returns `Some(line)` when `byte` terminates a non-empty line.  The
    /// returned slice is valid until the next call to `push`.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if self.complete {
            self.buf.clear();
            self.complete = false;
        }

        if byte == b'\n' {
            if self.discarding {
                warn!("Serial: line over {} bytes discarded", MAX_LINE_LEN);
                self.discarding = false;
                self.buf.clear();
                return None;
            }
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
            if self.buf.is_empty() {
                return None;
            }
            self.complete = true;
            return Some(&self.buf);
        }

        if !self.discarding && self.buf.push(byte).is_err() {
            self.discarding = true;
        }
        None
    }
}

/// Decode a framed line as a JSON document.  Failures are logged.
pub fn parse_line(line: &[u8]) -> Option<Value> {
    match serde_json::from_slice(line) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Serial: unparseable command line ({} bytes): {}", line.len(), e);
            None
        }
    }
}

/// Reply channel writing to the console.
#[derive(Debug, Default)]
pub struct ConsoleReply {
    /// Simulation: every line sent, in order.
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<String>,
}

impl ConsoleReply {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sent(&self) -> &[String] {
        &self.sent
    }
}

impl ReplyPort for ConsoleReply {
    #[cfg(target_os = "espidf")]
    fn send_line(&mut self, line: &str) {
        // stdout is the UART/USB-CDC console under ESP-IDF std.
        println!("{}", line);
    }

    #[cfg(not(target_os = "espidf"))]
    fn send_line(&mut self, line: &str) {
        self.sent.push(line.into());
    }
}
