// Keyboard teleop over the XBee link: W/S drive, A/D turn, R/F lift,
// arrows move the head, L toggles encoder lock, Q quits
//
// Usage: cargo run --example teleop_sender -- [port]

use std::io::Write;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serialport::SerialPort;
use tracing::info;

use meerkat_xbee_runtime::command::{flags, RobotCommand};
use meerkat_xbee_runtime::config::{DEFAULT_PORT, XBEE_BAUD};
use meerkat_xbee_runtime::link;

const AXIS_STEP: u8 = 8; // raw counts per arrow press
const INPUT_TIMEOUT_MS: u64 = 100; // Release drive and lift after this much time with no input

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let port_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    info!("Opening XBee link on {}", port_name);
    let mut port = link::open_port(&port_name, XBEE_BAUD)?;

    info!("Controls: W/S=drive, A/D=turn, R/F=lift, arrows=head, L=lock, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(port.as_mut());
    disable_raw_mode()?;

    result
}

fn run_teleop(port: &mut dyn SerialPort) -> Result<(), Box<dyn std::error::Error>> {
    // Momentary bits, released when input stops
    let mut drive: u8 = 0;
    let mut lift: u8 = 0;
    let mut last_drive_input = Instant::now();

    // Persistent state
    let mut lock = false;
    let mut chin = RobotCommand::default().chin;
    let mut rot_x = RobotCommand::default().rot_x;

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Drive - both wheels forward needs both strafe bits
                    KeyCode::Char('w') if pressed => {
                        drive = flags::MOVE_LEFT | flags::MOVE_RIGHT;
                        last_drive_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        drive = flags::REVERSE;
                        last_drive_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        drive = flags::MOVE_RIGHT;
                        last_drive_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        drive = flags::MOVE_LEFT;
                        last_drive_input = Instant::now();
                    }

                    // Lift
                    KeyCode::Char('r') if pressed => {
                        lift = flags::LIFT_UP;
                        last_drive_input = Instant::now();
                    }
                    KeyCode::Char('f') if pressed => {
                        lift = flags::LIFT_DOWN;
                        last_drive_input = Instant::now();
                    }

                    // Head axes; 0xFE is the top of the wire range
                    KeyCode::Left if pressed => {
                        rot_x = rot_x.saturating_sub(AXIS_STEP);
                    }
                    KeyCode::Right if pressed => {
                        rot_x = rot_x.saturating_add(AXIS_STEP).min(0xFE);
                    }
                    KeyCode::Up if pressed => {
                        chin = chin.saturating_add(AXIS_STEP).min(0xFE);
                    }
                    KeyCode::Down if pressed => {
                        chin = chin.saturating_sub(AXIS_STEP);
                    }

                    // Encoder lock: receiver freezes head axes while set
                    KeyCode::Char('l') if pressed => {
                        lock = !lock;
                        info!("Encoder lock: {}", if lock { "ON" } else { "off" });
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Release drive and lift if no input for INPUT_TIMEOUT_MS
        if last_drive_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            drive = 0;
            lift = 0;
        }

        let mut extended = drive | lift;
        if lock {
            extended |= flags::ENCODER_LOCK;
        }
        let cmd = RobotCommand {
            extended,
            chin,
            rot_x,
            ..RobotCommand::default()
        };

        // Always transmit at ~50Hz
        port.write_all(&link::encode(&cmd))?;
        port.flush()?;
    }

    Ok(())
}
