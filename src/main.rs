use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dcmotor_runtime::config::{Backend, CMD_TIMEOUT, LOOP_HZ, MAX_LOOP_HZ, RuntimeOptions};
use dcmotor_runtime::motor::HubPort;
use dcmotor_runtime::motor::drivers::port_hub::DEFAULT_ADDRESS;

/// Drive a DC motor from JSON commands published over zenoh
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Driver wiring to run
    #[arg(long, value_enum, default_value_t = Backend::TwoPinPwm)]
    backend: Backend,

    /// Control loop rate
    #[arg(
        long,
        default_value_t = LOOP_HZ,
        value_parser = clap::value_parser!(u64).range(1..=MAX_LOOP_HZ)
    )]
    loop_hz: u64,

    /// Stop an indefinite run after this long without commands (0 disables)
    #[arg(long, default_value_t = CMD_TIMEOUT.as_millis() as u64)]
    watchdog_ms: u64,

    /// Hub port index for the port-hub backend
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=5))]
    hub_port: u8,

    /// Hub I2C address for the port-hub backend
    #[arg(long, default_value_t = DEFAULT_ADDRESS)]
    hub_address: u8,
}

impl From<Args> for RuntimeOptions {
    fn from(args: Args) -> Self {
        Self {
            backend: args.backend,
            loop_hz: args.loop_hz,
            watchdog: (args.watchdog_ms > 0).then(|| Duration::from_millis(args.watchdog_ms)),
            hub_port: HubPort::try_from(args.hub_port).unwrap_or_default(),
            hub_address: args.hub_address,
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init(); // installs the subscriber globally

    let options = RuntimeOptions::from(Args::parse());

    if let Err(e) = dcmotor_runtime::runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
