//! ESP-01 device handle
//!
//! Owns one channel and runs transactions on it one at a time. The typed
//! operations here are thin wrappers over the catalog and the extractor.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::commands::AtCommand;
use crate::config::DeviceConfig;
use crate::protocol::{
    extract, extract_enum, Channel, Command, FromCode, Mode, ProtocolError, RawResponse,
    SerialChannel, Template, TransactionOutcome, TransactionRunner, Value,
};

/// Wi-Fi operating mode (`AT+CWMODE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiMode {
    /// Radio off
    Null,
    /// Station mode
    Station,
    /// SoftAP mode
    SoftAp,
    /// Station and SoftAP
    StationSoftAp,
}

impl WifiMode {
    /// Numeric value used by `AT+CWMODE`
    pub fn code(&self) -> i64 {
        match self {
            WifiMode::Null => 0,
            WifiMode::Station => 1,
            WifiMode::SoftAp => 2,
            WifiMode::StationSoftAp => 3,
        }
    }
}

impl FromCode for WifiMode {
    fn from_code(code: i64) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(WifiMode::Null),
            1 => Ok(WifiMode::Station),
            2 => Ok(WifiMode::SoftAp),
            3 => Ok(WifiMode::StationSoftAp),
            other => Err(ProtocolError::MalformedResponse(format!(
                "unknown Wi-Fi mode {}",
                other
            ))),
        }
    }
}

/// Station connection state (`AT+CWSTATE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiConnState {
    /// No connection started
    NotStarted,
    /// Connected, no IPv4 address yet
    ConnectedNoIp,
    /// Connected with an IPv4 address
    GotIp,
    /// Connecting or reconnecting
    Connecting,
    /// Disconnected
    Disconnected,
}

impl FromCode for WifiConnState {
    fn from_code(code: i64) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(WifiConnState::NotStarted),
            1 => Ok(WifiConnState::ConnectedNoIp),
            2 => Ok(WifiConnState::GotIp),
            3 => Ok(WifiConnState::Connecting),
            4 => Ok(WifiConnState::Disconnected),
            other => Err(ProtocolError::MalformedResponse(format!(
                "unknown Wi-Fi state {}",
                other
            ))),
        }
    }
}

/// Reply of `AT+CWSTATE?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiState {
    /// Connection state
    pub state: WifiConnState,
    /// Empty or absent when no AP is configured
    pub ssid: Option<String>,
}

/// Sleep mode (`AT+SLEEP`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepMode {
    /// Sleep disabled
    Disabled,
    /// Modem-sleep (DTIM)
    Modem,
    /// Light-sleep
    Light,
    /// Modem-sleep with listen interval
    ModemListenInterval,
}

impl FromCode for SleepMode {
    fn from_code(code: i64) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(SleepMode::Disabled),
            1 => Ok(SleepMode::Modem),
            2 => Ok(SleepMode::Light),
            3 => Ok(SleepMode::ModemListenInterval),
            other => Err(ProtocolError::MalformedResponse(format!(
                "unknown sleep mode {}",
                other
            ))),
        }
    }
}

/// Parse the `+CIPSNTPTIME:` payload, e.g. `Thu Aug 04 14:48:05 2016`
pub fn parse_sntp_time(text: &str) -> Result<NaiveDateTime, ProtocolError> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%a %b %d %H:%M:%S %Y")
        .map_err(|e| ProtocolError::MalformedResponse(format!("SNTP time {:?}: {}", text, e)))
}

/// A module on an exclusively owned channel
pub struct Esp01<C: Channel> {
    channel: C,
    runner: TransactionRunner,
    config: DeviceConfig,
    active: bool,
}

impl Esp01<SerialChannel> {
    /// Open the port named in `config`
    pub fn open(config: DeviceConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        let channel = SerialChannel::open(&config.port_name, config.baud_rate)?
            .with_native_line_ending(config.native_line_ending);
        Ok(Self::new(channel, config))
    }
}

impl<C: Channel> Esp01<C> {
    /// Wrap an already opened channel
    pub fn new(channel: C, config: DeviceConfig) -> Self {
        let runner = TransactionRunner::new(config.runner.clone());
        Self {
            channel,
            runner,
            config,
            active: false,
        }
    }

    /// True once the module has answered `AT`
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Settings the handle was built with
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Direct access to the channel, e.g. to flush it
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Give the channel back
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Run one raw transaction
    pub fn execute(&mut self, command: &Command, timeout: Duration) -> TransactionOutcome {
        self.runner.execute(&mut self.channel, command, timeout)
    }

    /// Run a catalog command with its own timeout, mapping failures to errors
    pub fn run(
        &mut self,
        cmd: AtCommand,
        mode: Mode,
        params: &[String],
    ) -> Result<RawResponse, ProtocolError> {
        let command = cmd.command(mode, params)?;
        self.request(&command, cmd.timeout())
    }

    fn request(&mut self, command: &Command, timeout: Duration) -> Result<RawResponse, ProtocolError> {
        let outcome = self.execute(command, timeout);
        if !outcome.is_ok() {
            tracing::debug!("{} failed: {:?}", command.label(), outcome);
        }
        outcome.into_result_with(self.runner.limits())
    }

    /// `AT`: check the module is alive
    pub fn test(&mut self) -> Result<(), ProtocolError> {
        let command = AtCommand::Test.command(Mode::None, &[])?;
        let timeout = self.config.timeout();
        self.request(&command, timeout)?;
        self.active = true;
        Ok(())
    }

    /// `AT+RST`
    pub fn reset(&mut self) -> Result<(), ProtocolError> {
        self.run(AtCommand::Reset, Mode::Execute, &[])?;
        self.active = false;
        Ok(())
    }

    /// `AT+GMR`: version lines as reported
    pub fn version(&mut self) -> Result<Vec<String>, ProtocolError> {
        let raw = self.run(AtCommand::Version, Mode::Execute, &[])?;
        Ok(raw.lines().map(|line| line.into_owned()).collect())
    }

    /// `ATE0` / `ATE1`
    pub fn set_echo(&mut self, enabled: bool) -> Result<(), ProtocolError> {
        let label = format!("{}{}", AtCommand::Echo.label(), u8::from(enabled));
        let command = Command::bare(label)?;
        self.request(&command, AtCommand::Echo.timeout())?;
        Ok(())
    }

    /// `AT+CWMODE?`
    pub fn wifi_mode(&mut self) -> Result<WifiMode, ProtocolError> {
        let raw = self.run(AtCommand::WifiMode, Mode::Query, &[])?;
        extract_enum(raw.body(), "+CWMODE:")
    }

    /// `AT+CWMODE=<mode>`
    pub fn set_wifi_mode(&mut self, mode: WifiMode) -> Result<(), ProtocolError> {
        self.run(AtCommand::WifiMode, Mode::Set, &[mode.code().to_string()])?;
        Ok(())
    }

    /// `AT+CWSTATE?`
    pub fn wifi_state(&mut self) -> Result<WifiState, ProtocolError> {
        let raw = self.run(AtCommand::WifiState, Mode::Query, &[])?;
        let template = Template::new("+CWSTATE:").int().optional().quoted();
        let values = extract(raw.body(), &template)?;
        let state = match values.first() {
            Some(Value::Int(code)) => WifiConnState::from_code(*code)?,
            _ => return Err(ProtocolError::MalformedResponse("+CWSTATE: no state".into())),
        };
        let ssid = values
            .get(1)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(WifiState { state, ssid })
    }

    /// `AT+SLEEP?`
    pub fn sleep_mode(&mut self) -> Result<SleepMode, ProtocolError> {
        let raw = self.run(AtCommand::Sleep, Mode::Query, &[])?;
        extract_enum(raw.body(), "+SLEEP:")
    }

    /// `AT+CIPSNTPTIME?`
    pub fn sntp_time(&mut self) -> Result<NaiveDateTime, ProtocolError> {
        let raw = self.run(AtCommand::SntpTime, Mode::Query, &[])?;
        let values = extract(raw.body(), &Template::new("+CIPSNTPTIME:").text())?;
        match values.first() {
            Some(Value::Str(text)) => parse_sntp_time(text),
            _ => Err(ProtocolError::MalformedResponse("+CIPSNTPTIME: no time".into())),
        }
    }
}
