//! Transaction outcomes
//!
//! Every receive buffer is normalized before it reaches these types: `\r`
//! bytes are dropped, so `\n` is the only line terminator.

use std::borrow::Cow;

use super::ProtocolError;

/// Success terminator line
pub const OK_LINE: &[u8] = b"OK";
/// Failure terminator line
pub const ERROR_LINE: &[u8] = b"ERROR";
/// Prefix of the structured error code line (`ERR CODE:0x01090000`)
pub const ERR_CODE_PREFIX: &[u8] = b"ERR CODE:";

/// Bytes accumulated during one transaction, terminator line included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    bytes: Vec<u8>,
}

impl RawResponse {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Whole normalized reply, status line included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reply decoded lossily
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Reply body: everything before the terminator line, with one trailing
    /// `\n` removed. Interior lines are kept as received.
    pub fn body(&self) -> &[u8] {
        let without_status = strip_status_line(&self.bytes);
        without_status
            .strip_suffix(b"\n")
            .unwrap_or(without_status)
    }

    /// Non-empty lines of the body
    pub fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.body()
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
            .map(String::from_utf8_lossy)
    }

    /// Numeric code from an `ERR CODE:0x…` line, if the module sent one
    pub fn error_code(&self) -> Option<u32> {
        self.bytes
            .split(|&b| b == b'\n')
            .find_map(|line| line.strip_prefix(ERR_CODE_PREFIX))
            .and_then(|rest| std::str::from_utf8(rest).ok())
            .and_then(|text| {
                let text = text.trim();
                let hex = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))?;
                u32::from_str_radix(hex, 16).ok()
            })
    }

    /// Take the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Remove the final status line (`OK\n` / `ERROR\n`) if present
fn strip_status_line(bytes: &[u8]) -> &[u8] {
    let content = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let line_start = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let last_line = &content[line_start..];
    if last_line == OK_LINE || last_line == ERROR_LINE {
        &bytes[..line_start]
    } else {
        bytes
    }
}

/// Which side of the link exceeded its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowKind {
    /// Encoded frame longer than the frame limit, nothing was sent
    Command,
    /// Reply longer than the response limit, reply discarded
    Response,
}

/// Terminal state of one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Module answered `OK`
    Ok(RawResponse),
    /// Module answered `ERROR`
    Error(RawResponse),
    /// Module answered `ERROR` after an `ERR CODE:` line
    ErrorCode { code: u32, raw: RawResponse },
    /// No terminator line before the deadline
    Timeout,
    /// A frame or the reply exceeded its limit
    Overflow(OverflowKind),
    /// Channel refused the frame
    ChannelUnavailable,
    /// Underlying read or write failed mid-transaction
    Transport(String),
}

impl TransactionOutcome {
    /// `true` only for `Ok`
    pub fn is_ok(&self) -> bool {
        matches!(self, TransactionOutcome::Ok(_))
    }

    /// Raw bytes received, for outcomes that carry them
    pub fn raw(&self) -> Option<&RawResponse> {
        match self {
            TransactionOutcome::Ok(raw)
            | TransactionOutcome::Error(raw)
            | TransactionOutcome::ErrorCode { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Convert into the error taxonomy.
    ///
    /// `limits` are `(max_frame_len, max_response_len)`; they only feed the
    /// overflow error messages.
    pub fn into_result_with(self, limits: (usize, usize)) -> Result<RawResponse, ProtocolError> {
        match self {
            TransactionOutcome::Ok(raw) => Ok(raw),
            TransactionOutcome::Error(_) => Err(ProtocolError::DeviceError { code: None }),
            TransactionOutcome::ErrorCode { code, .. } => {
                Err(ProtocolError::DeviceError { code: Some(code) })
            }
            TransactionOutcome::Timeout => Err(ProtocolError::Timeout),
            TransactionOutcome::Overflow(OverflowKind::Command) => {
                Err(ProtocolError::CommandOverflow { limit: limits.0 })
            }
            TransactionOutcome::Overflow(OverflowKind::Response) => {
                Err(ProtocolError::ResponseOverflow { limit: limits.1 })
            }
            TransactionOutcome::ChannelUnavailable => Err(ProtocolError::ChannelUnavailable),
            TransactionOutcome::Transport(msg) => Err(ProtocolError::SerialError(msg)),
        }
    }

    /// [`into_result_with`](Self::into_result_with) using the default limits
    pub fn into_result(self) -> Result<RawResponse, ProtocolError> {
        self.into_result_with((super::MAX_FRAME_LEN, super::MAX_RESPONSE_LEN))
    }
}

/// True only for [`TransactionOutcome::Ok`]
pub fn is_ok(outcome: &TransactionOutcome) -> bool {
    outcome.is_ok()
}
