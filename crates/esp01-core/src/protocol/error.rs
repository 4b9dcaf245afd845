//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the module
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Command overflow: frame exceeds {limit} bytes")]
    CommandOverflow { limit: usize },

    #[error("Response overflow: reply exceeds {limit} bytes")]
    ResponseOverflow { limit: usize },

    #[error("Response timeout")]
    Timeout,

    #[error("Channel not writable")]
    ChannelUnavailable,

    #[error("Device returned ERROR{}", fmt_code(.code))]
    DeviceError { code: Option<u32> },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn fmt_code(code: &Option<u32>) -> String {
    match code {
        Some(code) => format!(" (code {:#010x})", code),
        None => String::new(),
    }
}

impl ProtocolError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ProtocolError::MalformedResponse(msg.into())
    }
}
