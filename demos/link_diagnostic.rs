// Link diagnostic: READ-ONLY sniffer for the XBee teleop stream
//
// This tool does NOT transmit anything - it's completely safe to run while
// the robot is live. Use it to verify the remote, radio and framing before
// starting the runtime.
//
// Usage: cargo run --example link_diagnostic -- [port]
// Example: cargo run --example link_diagnostic -- /dev/ttyUSB0

use std::io::Read;
use std::time::{Duration, Instant};

use meerkat_xbee_runtime::command::RobotCommand;
use meerkat_xbee_runtime::config::{DEFAULT_PORT, XBEE_BAUD};
use meerkat_xbee_runtime::link::{self, PacketDecoder, PACKET_LEN};

const SUMMARY_PERIOD: Duration = Duration::from_secs(5);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    // Get port from args or use default
    let port_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            Meerkat Link Diagnostic (READ-ONLY)               ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  This tool only LISTENS on the link - nothing is transmitted ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Serial port: {} @ {} baud", port_name, XBEE_BAUD);
    println!();

    // Try to open serial port
    println!("Step 1: Opening serial port...");
    let mut port = match link::open_port(&port_name, XBEE_BAUD) {
        Ok(port) => {
            println!("  ✓ Serial port opened successfully");
            port
        }
        Err(e) => {
            println!("  ✗ Failed to open serial port: {}", e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the port path is correct");
            println!("  - Verify the XBee adapter is plugged in");
            println!("  - Check the device permissions (dialout group on Linux)");
            return Err(e.into());
        }
    };
    println!();

    println!("Step 2: Listening for packets (Ctrl+C to stop)...");
    println!();

    let mut decoder = PacketDecoder::new();
    let mut buf = [0u8; 64];
    let mut total_bytes: u64 = 0;
    let mut total_commands: u64 = 0;
    let mut last_summary = Instant::now();

    loop {
        match port.read(&mut buf) {
            Ok(n) if n > 0 => {
                total_bytes += n as u64;
                print!("  raw:");
                for &byte in &buf[..n] {
                    print!(" {:02X}", byte);
                }
                println!();

                for &byte in &buf[..n] {
                    if let Some(cmd) = decoder.push(byte) {
                        total_commands += 1;
                        println!("  cmd: {}", describe(&cmd));
                    }
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                println!("  ✗ Read error: {}", e);
                return Err(e.into());
            }
        }

        if last_summary.elapsed() >= SUMMARY_PERIOD {
            // A clean stream carries exactly PACKET_LEN bytes per command
            let expected = total_bytes / PACKET_LEN as u64;
            println!();
            println!(
                "  --- {} bytes, {} commands decoded ({} frames expected), last: {}",
                total_bytes,
                total_commands,
                expected,
                describe(&decoder.last_command())
            );
            println!();
            last_summary = Instant::now();
        }
    }
}

/// One-line human summary of a decoded command.
fn describe(cmd: &RobotCommand) -> String {
    let mut bits: Vec<&str> = Vec::new();
    if cmd.reverse() {
        bits.push("REVERSE");
    }
    if cmd.move_left() {
        bits.push("LEFT");
    }
    if cmd.move_right() {
        bits.push("RIGHT");
    }
    match cmd.lift_target() {
        t if t > 0.0 => bits.push("LIFT-UP"),
        t if t < 0.0 => bits.push("LIFT-DOWN"),
        _ => {}
    }
    if cmd.encoder_lock() {
        bits.push("LOCK");
    }
    let bits = if bits.is_empty() {
        "idle".to_string()
    } else {
        bits.join("+")
    };

    format!(
        "extended=0b{:08b} [{}] chin={} rotX={} | wheels L{:+.0} R{:+.0}",
        cmd.extended,
        bits,
        cmd.chin,
        cmd.rot_x,
        cmd.left_wheel_target(),
        cmd.right_wheel_target(),
    )
}
