use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use meerkat_xbee_runtime::config::{ConfigError, RuntimeConfig};
use meerkat_xbee_runtime::runtime::{self, Actuators};

/// Meerkat teleop receiver runtime
#[derive(Parser, Debug)]
#[command(name = "meerkat-runtime")]
#[command(version)]
#[command(about = "Decodes XBee teleop packets and drives the robot's five actuators")]
struct Args {
    /// Path to a JSON config file; the flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device the XBee is attached to
    #[arg(short, long)]
    port: Option<String>,

    /// Link baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Enable the watchdog with this timeout in milliseconds
    #[arg(long, value_name = "MS")]
    watchdog_ms: Option<u64>,

    /// Use the linear rotation mapping instead of the stock two-position one
    #[arg(long)]
    corrected_rotation_clamp: bool,
}

fn load_config(args: &Args) -> Result<RuntimeConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };

    if let Some(port) = &args.port {
        config.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.baud = baud;
    }
    if let Some(ms) = args.watchdog_ms {
        config.watchdog_timeout_ms = Some(ms);
    }
    if args.corrected_rotation_clamp {
        config.corrected_rotation_clamp = true;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    // The binary runs simulated actuators; hardware deployments call
    // runtime::run with their own bindings.
    if let Err(e) = runtime::run(config, Actuators::simulated()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
