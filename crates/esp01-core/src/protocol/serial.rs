//! Serial port handling
//!
//! Provides low-level serial port access and the [`Channel`] adapter the
//! transaction engine runs on.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use super::{Channel, ProtocolError, DEFAULT_BAUD_RATE};

/// Default interval between `bytes_to_read` polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb_info) => (
                Some(usb_info.vid),
                Some(usb_info.pid),
                usb_info.manufacturer,
                usb_info.product,
            ),
            _ => (None, None, None, None),
        };

        Self {
            name: info.port_name,
            vid,
            pid,
            manufacturer,
            product,
        }
    }
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }
}

/// USB-serial bridges first (ttyUSB*, the usual ESP-01 adapter), then
/// ttyACM*, then everything else by name
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Open a serial port with default settings
pub fn open_port(name: &str, baud_rate: Option<u32>) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    serialport::new(name, baud)
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(name.to_string()),
            _ => ProtocolError::SerialError(e.to_string()),
        })
}

/// Configure a serial port for the module: 8N1, no flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    Ok(())
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))
}

/// [`Channel`] over a `serialport` handle
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    poll_interval: Duration,
    /// Rewrite bare `\n` as `\r\n` on the wire
    native_line_ending: bool,
    last_written: Option<u8>,
}

impl SerialChannel {
    /// Wrap a configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            poll_interval: DEFAULT_POLL_INTERVAL,
            native_line_ending: false,
            last_written: None,
        }
    }

    /// Open, configure and flush a port in one go
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, ProtocolError> {
        let mut port = open_port(name, Some(baud_rate))?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;
        tracing::debug!("opened {} at {} baud", name, baud_rate);
        Ok(Self::new(port))
    }

    /// How often `bytes_to_read` is polled while waiting
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Insert `\r` before every `\n` written
    pub fn with_native_line_ending(mut self, enabled: bool) -> Self {
        self.native_line_ending = enabled;
        self
    }

    /// Current poll interval
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Give the port back
    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

impl Channel for SerialChannel {
    fn is_writable(&mut self) -> bool {
        match self.port.bytes_to_write() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("serial port not writable: {}", e);
                false
            }
        }
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        if self.native_line_ending && byte == b'\n' && self.last_written != Some(b'\r') {
            self.port.write_all(b"\r")?;
        }
        self.port.write_all(&[byte])?;
        self.last_written = Some(byte);
        Ok(())
    }

    fn byte_ready_within(&mut self, timeout: Duration) -> io::Result<bool> {
        let start = Instant::now();
        loop {
            if self.port.bytes_to_read()? > 0 {
                return Ok(true);
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(false);
            }
            std::thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.port.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        for &byte in data {
            self.write_byte(byte)?;
        }
        self.port.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports() {
        // Only checks that enumeration does not panic
        let ports = list_ports();
        for port in &ports {
            println!("Found port: {} - {:?}", port.name, port.product);
        }
    }

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyACM1",
            "/dev/ttyUSB1",
            "/dev/ttyUSB0",
            "/dev/someport",
            "/dev/ttyUSB10",
            "/dev/ttyACM0",
        ];
        let mut ports: Vec<PortInfo> = names
            .into_iter()
            .map(|n| PortInfo::bare(n.to_string()))
            .collect();

        ports.sort_by_key(|p| port_sort_key(&p.name));
        let ordered: Vec<String> = ports.into_iter().map(|p| p.name).collect();

        assert_eq!(
            ordered,
            vec![
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/ttyUSB10",
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_open_missing_port() {
        assert!(open_port("/dev/esp01-does-not-exist", None).is_err());
    }
}
