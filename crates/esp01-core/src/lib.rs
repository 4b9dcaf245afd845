//! # esp01 Core Library
//!
//! Drives ESP-01 Wi-Fi modules through the AT command protocol.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Frame encoding for AT commands
//! - A transaction runner that sends one command and waits for `OK`/`ERROR`
//! - Field extraction from reply bodies
//! - A command catalog and a typed device handle
//! - A simulated module for running sessions without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use esp01_core::{config::DeviceConfig, device::Esp01};
//!
//! let config = DeviceConfig {
//!     port_name: "/dev/ttyUSB0".into(),
//!     ..Default::default()
//! };
//! let mut esp = Esp01::open(config)?;
//! esp.test()?;
//! println!("mode: {:?}", esp.wifi_mode()?);
//! ```

pub mod commands;
pub mod config;
pub mod demo;
pub mod device;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::AtCommand;
    pub use crate::config::DeviceConfig;
    pub use crate::demo::SimulatedEsp01;
    pub use crate::device::{Esp01, SleepMode, WifiConnState, WifiMode, WifiState};
    pub use crate::protocol::{
        extract, is_ok, Channel, Command, Mode, ProtocolError, RawResponse, Template,
        TransactionOutcome, TransactionRunner, Value,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
