//! AT Command Protocol
//!
//! Implements the request/response transaction engine used to drive an
//! ESP-01 module over a serial link.
//!
//! Each transaction writes one newline-terminated frame and reads until the
//! module answers with an `OK` or `ERROR` line.

mod channel;
mod encoder;
mod error;
pub mod extract;
mod response;
pub mod serial;
mod transaction;

pub use channel::{Channel, LineEnding};
pub use encoder::{quoted, Command, Frame, FrameEncoder, Mode, PARAM_SEPARATOR};
pub use error::ProtocolError;
pub use extract::{extract, extract_all, extract_enum, FromCode, Template, Value};
pub use response::{is_ok, OverflowKind, RawResponse, TransactionOutcome};
pub use serial::{clear_buffers, configure_port, list_ports, open_port, PortInfo, SerialChannel};
pub use transaction::{RunnerConfig, TransactionRunner};

/// Default baud rate for the module
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default timeout for a reply in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Maximum encoded command length accepted by the firmware
pub const MAX_FRAME_LEN: usize = 256;

/// Maximum reply length buffered for a single transaction
pub const MAX_RESPONSE_LEN: usize = 2048;
