// Serial intake for the XBee teleop link.
//
// Reads raw bytes off the radio's serial port on a blocking thread, runs them
// through the packet decoder and publishes every validated command to the
// runtime's watch channel.

use std::io::Read;
use std::time::Duration;

use serialport::SerialPort;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::RobotCommand;
use crate::link::protocol::PacketDecoder;

/// Read timeout on the link port; bounds how long the intake thread sleeps
/// between polls when the radio goes quiet.
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Error types for the teleop link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the serial port the XBee is attached to.
pub fn open_port(port_name: &str, baud: u32) -> Result<Box<dyn SerialPort>, LinkError> {
    let port = serialport::new(port_name, baud)
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .open()?;

    Ok(port)
}

/// Spawn the intake loop on a blocking worker. The task ends when the
/// command channel loses its last receiver.
pub fn spawn_intake(
    port: Box<dyn SerialPort>,
    commands: watch::Sender<RobotCommand>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || intake_loop(port, commands))
}

fn intake_loop(mut port: Box<dyn SerialPort>, commands: watch::Sender<RobotCommand>) {
    let mut decoder = PacketDecoder::new();
    let mut buf = [0u8; 64];

    loop {
        let n = match port.read(&mut buf) {
            Ok(n) => n,
            // Quiet link; keep polling
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                warn!("Serial read failed: {}", e);
                std::thread::sleep(Duration::from_millis(DEFAULT_TIMEOUT_MS));
                continue;
            }
        };

        for &byte in &buf[..n] {
            if let Some(cmd) = decoder.push(byte) {
                debug!("Decoded command: {:?}", cmd);
                if commands.send(cmd).is_err() {
                    return;
                }
            }
        }
    }
}
