//! Demo Mode - simulated ESP-01 module
//!
//! Answers a small subset of the AT command set the way the stock firmware
//! does (CRLF line endings, optional echo) so sessions can be exercised
//! without hardware.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::protocol::Channel;

/// Code the firmware reports for an unknown command
pub const UNKNOWN_COMMAND_CODE: u32 = 0x0109_0000;

/// Simulated module implementing [`Channel`]
#[derive(Debug, Clone)]
pub struct SimulatedEsp01 {
    echo: bool,
    wifi_mode: u8,
    sleep_mode: u8,
    wifi_state: u8,
    ssid: String,
    writable: bool,
    muted: bool,
    /// Bytes received from the host for the current line
    rx: Vec<u8>,
    /// Bytes waiting to be read by the host
    tx: VecDeque<u8>,
    /// Every command line received, without terminator
    received: Vec<String>,
}

impl Default for SimulatedEsp01 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEsp01 {
    /// Fresh module: echo on, station mode, connected to "demo-net"
    pub fn new() -> Self {
        Self {
            echo: true,
            wifi_mode: 1,
            sleep_mode: 1,
            wifi_state: 2,
            ssid: "demo-net".to_string(),
            writable: true,
            muted: false,
            rx: Vec::new(),
            tx: VecDeque::new(),
            received: Vec::new(),
        }
    }

    /// Make the channel report itself unwritable
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Swallow commands without replying
    pub fn mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Whether `ATE1` is in effect
    pub fn echo_enabled(&self) -> bool {
        self.echo
    }

    /// Current `AT+CWMODE` value
    pub fn wifi_mode(&self) -> u8 {
        self.wifi_mode
    }

    /// Every command line received so far, without terminators
    pub fn received(&self) -> &[String] {
        &self.received
    }

    fn push_line(&mut self, line: &str) {
        self.tx.extend(line.as_bytes());
        self.tx.extend(b"\r\n");
    }

    fn reply(&mut self, lines: &[String]) {
        for line in lines {
            self.push_line(line);
        }
        self.push_line("");
        self.push_line("OK");
    }

    fn reply_error(&mut self) {
        self.push_line(&format!("ERR CODE:{:#010x}", UNKNOWN_COMMAND_CODE));
        self.push_line("");
        self.push_line("ERROR");
    }

    fn handle(&mut self, raw_line: Vec<u8>) {
        let line = String::from_utf8_lossy(&raw_line)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        tracing::trace!("simulator received {:?}", line);
        self.received.push(line.clone());

        if self.muted {
            return;
        }
        if self.echo {
            self.tx.extend(&raw_line);
        }

        match line.as_str() {
            "AT" | "AT+RST" => self.reply(&[]),
            "ATE0" | "ATE1" => {
                self.echo = line.ends_with('1');
                self.reply(&[]);
            }
            "AT+GMR" => self.reply(&[
                "AT version:2.2.0.0(s-90458f0 - ESP8266 - Jun 18 2021 10:24:22)".to_string(),
                "SDK version:v3.4-22-g967752e2".to_string(),
                "compile time(6800286):Aug  4 2021 17:20:05".to_string(),
            ]),
            "AT+CWMODE?" => self.reply(&[format!("+CWMODE:{}", self.wifi_mode)]),
            "AT+CWSTATE?" => {
                let state = format!("+CWSTATE:{},\"{}\"", self.wifi_state, self.ssid);
                self.reply(&[state]);
            }
            "AT+SLEEP?" => self.reply(&[format!("+SLEEP:{}", self.sleep_mode)]),
            "AT+CIPSNTPTIME?" => {
                self.reply(&["+CIPSNTPTIME:Thu Aug 04 14:48:05 2016".to_string()])
            }
            other => match other.strip_prefix("AT+CWMODE=").map(str::parse::<u8>) {
                Some(Ok(mode)) if mode <= 3 => {
                    self.wifi_mode = mode;
                    self.reply(&[]);
                }
                _ => self.reply_error(),
            },
        }
    }
}

impl Channel for SimulatedEsp01 {
    fn is_writable(&mut self) -> bool {
        self.writable
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.rx.push(byte);
        if byte == b'\n' {
            let line = std::mem::take(&mut self.rx);
            self.handle(line);
        }
        Ok(())
    }

    fn byte_ready_within(&mut self, timeout: Duration) -> io::Result<bool> {
        if self.tx.is_empty() {
            std::thread::sleep(timeout);
            return Ok(false);
        }
        Ok(true)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.tx
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }
}
