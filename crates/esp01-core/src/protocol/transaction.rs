//! Transaction runner
//!
//! One transaction = encode, write, then read until a terminator line.
//! The runner holds the channel mutably for the whole exchange, so only one
//! command can be in flight on it.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{
    response::{ERROR_LINE, OK_LINE},
    Channel, Command, Frame, FrameEncoder, LineEnding, OverflowKind, RawResponse,
    TransactionOutcome, MAX_FRAME_LEN, MAX_RESPONSE_LEN,
};

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Longest frame that will be sent
    pub max_frame_len: usize,
    /// Longest reply that will be buffered
    pub max_response_len: usize,
    /// Terminator written at the end of each frame
    pub line_ending: LineEnding,
    /// Emit `tracing` events for frames, lines and outcomes
    pub trace: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
            max_response_len: MAX_RESPONSE_LEN,
            line_ending: LineEnding::Lf,
            trace: false,
        }
    }
}

/// What the last received line means
#[derive(Debug, PartialEq, Eq)]
enum LineKind {
    Echo,
    Ok,
    Error,
    Other,
}

/// Receive buffer for a single transaction
struct ResponseBuffer {
    bytes: Vec<u8>,
    limit: usize,
    /// Set once the echo line was consumed; its `\n` then bounds the
    /// first line of the buffer
    after_echo: bool,
}

impl ResponseBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            after_echo: false,
        }
    }

    /// Append a byte; `false` when the buffer is full
    fn push(&mut self, byte: u8) -> bool {
        if self.bytes.len() >= self.limit {
            return false;
        }
        self.bytes.push(byte);
        true
    }

    /// Drop the echo line
    fn consume_echo(&mut self) {
        self.bytes.clear();
        self.after_echo = true;
    }

    /// Whether the buffer ends with `line` bounded by `\n` on both sides.
    /// The start of the buffer only counts as a boundary after an echo.
    fn ends_with_line(&self, line: &[u8]) -> bool {
        let Some(content) = self.bytes.strip_suffix(b"\n") else {
            return false;
        };
        let Some(prefix) = content.strip_suffix(line) else {
            return false;
        };
        prefix.ends_with(b"\n") || (prefix.is_empty() && self.after_echo)
    }

    fn classify(&self, echo: Option<&[u8]>) -> LineKind {
        if echo.is_some_and(|echo| self.bytes == echo) {
            LineKind::Echo
        } else if self.ends_with_line(OK_LINE) {
            LineKind::Ok
        } else if self.ends_with_line(ERROR_LINE) {
            LineKind::Error
        } else {
            LineKind::Other
        }
    }
}

/// Runs command transactions against a channel
#[derive(Debug, Clone, Default)]
pub struct TransactionRunner {
    config: RunnerConfig,
    encoder: FrameEncoder,
}

impl TransactionRunner {
    /// Runner with an encoder built from `config`
    pub fn new(config: RunnerConfig) -> Self {
        let encoder = FrameEncoder::new(config.max_frame_len, config.line_ending);
        Self { config, encoder }
    }

    /// Active configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Encoder used for every frame
    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    /// `(max_frame_len, max_response_len)`
    pub fn limits(&self) -> (usize, usize) {
        (self.config.max_frame_len, self.config.max_response_len)
    }

    /// Run one command to a terminal outcome.
    ///
    /// `timeout` bounds the total wait for the reply, not the gap between
    /// bytes. Nothing is retried here.
    pub fn execute<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        command: &Command,
        timeout: Duration,
    ) -> TransactionOutcome {
        let frame = match self.encoder.encode(command) {
            Ok(frame) => frame,
            Err(e) => {
                self.trace(|| format!("{}: encode failed: {}", command.label(), e));
                return TransactionOutcome::Overflow(OverflowKind::Command);
            }
        };

        if !channel.is_writable() {
            self.trace(|| format!("{}: channel not writable", command.label()));
            return TransactionOutcome::ChannelUnavailable;
        }

        if let Err(e) = channel.write_all(frame.as_bytes()) {
            return TransactionOutcome::Transport(e.to_string());
        }
        self.trace(|| format!("sent {:?}", String::from_utf8_lossy(frame.as_bytes())));

        let outcome = self.receive(channel, &frame, timeout);
        self.trace(|| format!("{}: {:?}", command.label(), outcome));
        outcome
    }

    fn receive<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        frame: &Frame,
        timeout: Duration,
    ) -> TransactionOutcome {
        let deadline = Instant::now() + timeout;
        let echo = frame.content();
        let mut echo_pending = true;
        let mut buffer = ResponseBuffer::new(self.config.max_response_len);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return TransactionOutcome::Timeout;
            }
            match channel.byte_ready_within(remaining) {
                Ok(true) => {}
                Ok(false) => return TransactionOutcome::Timeout,
                Err(e) => return TransactionOutcome::Transport(e.to_string()),
            }

            let byte = match channel.read_byte() {
                Ok(byte) => byte,
                Err(e) => return TransactionOutcome::Transport(e.to_string()),
            };

            if byte == b'\r' {
                continue;
            }
            if !buffer.push(byte) {
                return TransactionOutcome::Overflow(OverflowKind::Response);
            }
            if byte != b'\n' {
                continue;
            }

            let echo_ref = echo_pending.then_some(echo.as_slice());
            match buffer.classify(echo_ref) {
                LineKind::Echo => {
                    self.trace(|| "echo consumed".to_string());
                    echo_pending = false;
                    buffer.consume_echo();
                }
                LineKind::Ok => return TransactionOutcome::Ok(RawResponse::new(buffer.bytes)),
                LineKind::Error => {
                    let raw = RawResponse::new(buffer.bytes);
                    return match raw.error_code() {
                        Some(code) => TransactionOutcome::ErrorCode { code, raw },
                        None => TransactionOutcome::Error(raw),
                    };
                }
                LineKind::Other => {}
            }
        }
    }

    fn trace(&self, msg: impl FnOnce() -> String) {
        if self.config.trace {
            tracing::trace!(target: "esp01::transaction", "{}", msg());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(bytes: &[u8]) -> ResponseBuffer {
        let mut buf = ResponseBuffer::new(64);
        for &b in bytes {
            assert!(buf.push(b));
        }
        buf
    }

    #[test]
    fn test_terminator_needs_boundaries() {
        assert_eq!(buffer(b"\nOK\n").classify(None), LineKind::Ok);
        assert_eq!(buffer(b"OK\n").classify(None), LineKind::Other);
        assert_eq!(buffer(b"\nNOK\n").classify(None), LineKind::Other);
        assert_eq!(buffer(b"\n+X:OK\n").classify(None), LineKind::Other);
        assert_eq!(buffer(b"\nERROR\n").classify(None), LineKind::Error);
        assert_eq!(buffer(b"\nOK").classify(None), LineKind::Other);
    }

    #[test]
    fn test_echo_line_bounds_first_line() {
        let mut buf = buffer(b"AT\n");
        buf.consume_echo();
        for &b in b"OK\n" {
            assert!(buf.push(b));
        }
        assert_eq!(buf.classify(None), LineKind::Ok);
    }

    #[test]
    fn test_echo_needs_exact_match() {
        assert_eq!(buffer(b"AT?\n").classify(Some(&b"AT?\n"[..])), LineKind::Echo);
        assert_eq!(buffer(b"AT\n").classify(Some(&b"AT?\n"[..])), LineKind::Other);
    }

    #[test]
    fn test_buffer_limit() {
        let mut buf = ResponseBuffer::new(2);
        assert!(buf.push(b'a'));
        assert!(buf.push(b'b'));
        assert!(!buf.push(b'c'));
    }

    #[test]
    fn test_runner_limits_follow_config() {
        let runner = TransactionRunner::new(RunnerConfig {
            max_frame_len: 32,
            max_response_len: 128,
            ..Default::default()
        });
        assert_eq!(runner.limits(), (32, 128));
        assert_eq!(runner.encoder().max_len(), 32);
    }
}
