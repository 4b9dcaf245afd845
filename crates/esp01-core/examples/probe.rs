//! ESP-01 Probe Tool
//!
//! Opens a serial port, checks the module answers `AT` and prints what it
//! reports about itself.
//!
//! Usage:
//!   cargo run --example probe -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (default: first detected port)
//!   --baud RATE       Baud rate (default: 115200)
//!   --timeout MS      Reply timeout in ms (default: 1000)
//!   --config FILE     Load settings from a JSON file
//!   --crlf            Terminate frames with CRLF
//!   --trace           Log every frame and outcome
//!   --list            List serial ports and exit

use anyhow::{bail, Context};
use esp01_core::config::DeviceConfig;
use esp01_core::device::Esp01;
use esp01_core::protocol::{self, LineEnding};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("Usage: probe [--port PORT] [--baud RATE] [--timeout MS] [--config FILE]");
    println!("             [--crlf] [--trace] [--list] [PORT]");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = DeviceConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    config.port_name = args[i].clone();
                }
            }
            "--baud" | "-b" => {
                i += 1;
                if i < args.len() {
                    config.baud_rate = args[i].parse().context("invalid baud rate")?;
                }
            }
            "--timeout" | "-t" => {
                i += 1;
                if i < args.len() {
                    config.timeout_ms = args[i].parse().context("invalid timeout")?;
                }
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config = DeviceConfig::from_file(&args[i])
                        .with_context(|| format!("loading {}", args[i]))?;
                }
            }
            "--crlf" => config.runner.line_ending = LineEnding::CrLf,
            "--trace" => config.runner.trace = true,
            "--list" | "-l" => {
                for port in protocol::list_ports() {
                    println!("{}  {:?}", port.name, port.product);
                }
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            arg if !arg.starts_with('-') => config.port_name = arg.to_string(),
            other => eprintln!("Unknown option: {}", other),
        }
        i += 1;
    }

    if config.port_name.is_empty() {
        match protocol::list_ports().into_iter().next() {
            Some(port) => config.port_name = port.name,
            None => bail!("no serial ports found"),
        }
    }

    println!("Port:      {}", config.port_name);
    println!("Baud rate: {}", config.baud_rate);
    println!("Timeout:   {}ms", config.timeout_ms);
    println!();

    let mut esp = Esp01::open(config)?;
    esp.test().context("module did not answer AT")?;
    println!("✓ Module answered AT");

    for line in esp.version()? {
        println!("  {}", line);
    }

    match esp.wifi_mode() {
        Ok(mode) => println!("Wi-Fi mode: {:?}", mode),
        Err(e) => println!("Wi-Fi mode unavailable: {}", e),
    }
    match esp.wifi_state() {
        Ok(state) => println!("Wi-Fi state: {:?} ({:?})", state.state, state.ssid),
        Err(e) => println!("Wi-Fi state unavailable: {}", e),
    }

    Ok(())
}
