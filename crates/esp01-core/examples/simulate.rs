//! Runs a short session against the simulated module.
//!
//! Usage:
//!   RUST_LOG=esp01=trace cargo run --example simulate

use esp01_core::prelude::*;
use esp01_core::protocol::TransactionOutcome;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = DeviceConfig::default();
    config.runner.trace = true;
    let mut esp = Esp01::new(SimulatedEsp01::new(), config);

    esp.test()?;
    println!("AT -> OK");

    for line in esp.version()? {
        println!("GMR: {}", line);
    }

    esp.set_wifi_mode(WifiMode::SoftAp)?;
    println!("CWMODE: {:?}", esp.wifi_mode()?);
    println!("CWSTATE: {:?}", esp.wifi_state()?);
    println!("SNTP: {}", esp.sntp_time()?);

    let outcome = esp.execute(&Command::query("AT+BOGUS")?, Duration::from_millis(200));
    match outcome {
        TransactionOutcome::ErrorCode { code, .. } => println!("AT+BOGUS? -> ERROR {:#010x}", code),
        other => println!("AT+BOGUS? -> {:?}", other),
    }

    Ok(())
}
