// 200 Hz control cycle with optional watchdog
//
// Every tick takes the latest decoded command and moves all five actuators
// one smoothing step toward the targets it implies. The watchdog (off by
// default) stops the wheels and lift when the radio goes quiet instead of
// holding the last command forever.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, warn};

use crate::actuator::{
    chin_pulse_target, rotation_pulse_target, DriveMotor, PwmOutput, SimDriveMotor, SimPwm,
    SmoothedDrive, SmoothedPulse,
};
use crate::command::RobotCommand;
use crate::config::{RuntimeConfig, ServoRange, MOTOR_REFRESH_PERIOD, SERVO_PERIOD};
use crate::link;

/// Health of the command link as seen by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

/// The five outputs the control loop writes every cycle.
///
/// Real deployments bind these to hardware drivers; [`Actuators::simulated`]
/// runs the full loop without any.
pub struct Actuators {
    pub left_wheel: Box<dyn DriveMotor + Send>,
    pub right_wheel: Box<dyn DriveMotor + Send>,
    pub lift: Box<dyn DriveMotor + Send>,
    pub rotation: Box<dyn PwmOutput + Send>,
    pub chin: Box<dyn PwmOutput + Send>,
}

impl Actuators {
    pub fn simulated() -> Self {
        Self {
            left_wheel: Box::new(SimDriveMotor::new("left_wheel")),
            right_wheel: Box::new(SimDriveMotor::new("right_wheel")),
            lift: Box::new(SimDriveMotor::new("lift")),
            rotation: Box::new(SimPwm::new("rotation")),
            chin: Box::new(SimPwm::new("chin")),
        }
    }

    /// Power-on peripheral setup: motor refresh periods and servo PWM frames.
    fn initialize(&mut self) {
        for motor in [
            &mut self.left_wheel,
            &mut self.right_wheel,
            &mut self.lift,
        ] {
            motor.set_refresh_period(MOTOR_REFRESH_PERIOD);
        }
        self.rotation.set_period(SERVO_PERIOD);
        self.chin.set_period(SERVO_PERIOD);
    }
}

/// One smoothing pass over all five actuators.
///
/// Wheels and lift are stepped against their driver's reported level; the two
/// servo joints carry their running pulse width here because PWM outputs are
/// write-only.
pub struct ControlCycle {
    left: SmoothedDrive,
    right: SmoothedDrive,
    lift: SmoothedDrive,
    rotation: SmoothedPulse,
    chin: SmoothedPulse,
    rotation_range: ServoRange,
    chin_range: ServoRange,
    corrected_clamp: bool,
}

impl ControlCycle {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            left: SmoothedDrive::new(config.gains.wheels),
            right: SmoothedDrive::new(config.gains.wheels),
            lift: SmoothedDrive::new(config.gains.lift),
            rotation: SmoothedPulse::new(config.gains.rotation, config.rotation.neutral_us),
            chin: SmoothedPulse::new(config.gains.chin, config.chin.neutral_us),
            rotation_range: config.rotation,
            chin_range: config.chin,
            corrected_clamp: config.corrected_rotation_clamp,
        }
    }

    /// Advance every actuator one step toward the command's targets.
    pub fn step(&mut self, cmd: &RobotCommand, out: &mut Actuators) {
        self.left
            .update(out.left_wheel.as_mut(), cmd.left_wheel_target());
        self.right
            .update(out.right_wheel.as_mut(), cmd.right_wheel_target());
        self.lift.update(out.lift.as_mut(), cmd.lift_target());

        let target = rotation_pulse_target(cmd.rot_x, &self.rotation_range, self.corrected_clamp);
        let rotation_us = self.rotation.update(target);
        out.rotation.set_pulse_width(micros(rotation_us));

        let target = chin_pulse_target(cmd.chin, &self.chin_range);
        let chin_us = self.chin.update(target);
        out.chin.set_pulse_width(micros(chin_us));
    }

    /// Watchdog actuation: wheels and lift decay to zero, the servo joints
    /// hold their pulse (dropping the PWM would let the head fall).
    pub fn step_stale(&mut self, out: &mut Actuators) {
        self.left.update(out.left_wheel.as_mut(), 0.0);
        self.right.update(out.right_wheel.as_mut(), 0.0);
        self.lift.update(out.lift.as_mut(), 0.0);
        out.rotation
            .set_pulse_width(micros(self.rotation.current_us()));
        out.chin.set_pulse_width(micros(self.chin.current_us()));
    }

    pub fn rotation_pulse_us(&self) -> f32 {
        self.rotation.current_us()
    }

    pub fn chin_pulse_us(&self) -> f32 {
        self.chin.current_us()
    }
}

fn micros(us: f32) -> Duration {
    Duration::from_micros(us.round() as u64)
}

pub struct Runtime {
    cycle: ControlCycle,
    watchdog_timeout: Option<Duration>,
    cmd_received_at: Option<Instant>,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            cycle: ControlCycle::new(config),
            watchdog_timeout: config.watchdog_timeout(),
            cmd_received_at: None,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Note a freshly received command.
    fn on_command(&mut self) {
        self.cmd_received_at = Some(Instant::now());
    }

    /// Take the newest command off the channel. The freshness stamp comes
    /// from the same borrow that yields the value, so a command landing
    /// between loop steps cannot be consumed unstamped; commands decoded
    /// between ticks collapse into the newest one and a single stamp.
    fn take_latest(&mut self, rx: &mut watch::Receiver<RobotCommand>) -> RobotCommand {
        let latest = rx.borrow_and_update();
        if latest.has_changed() {
            self.on_command();
        }
        *latest
    }

    fn command_is_fresh(&self) -> bool {
        match self.watchdog_timeout {
            // Watchdog disabled: the last command stands forever
            None => true,
            Some(timeout) => match self.cmd_received_at {
                Some(at) => at.elapsed() <= timeout,
                None => false,
            },
        }
    }

    /// One control cycle: pick fresh-vs-stale actuation and write all five
    /// outputs.
    pub fn tick(&mut self, cmd: &RobotCommand, out: &mut Actuators) {
        if self.command_is_fresh() {
            if self.health != RuntimeHealth::Ok && self.cmd_received_at.is_some() {
                info!("Command link active");
            }
            self.health = RuntimeHealth::Ok;
            self.cycle.step(cmd, out);
        } else {
            if self.health != RuntimeHealth::CmdStale {
                let age = self
                    .cmd_received_at
                    .map(|at| at.elapsed())
                    .unwrap_or_default();
                warn!("Command stale ({:?} old), stopping wheels and lift", age);
            }
            self.health = RuntimeHealth::CmdStale;
            self.cycle.step_stale(out);
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }
}

pub async fn run(
    config: RuntimeConfig,
    mut actuators: Actuators,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    info!(
        "Opening teleop link on {} at {} baud",
        config.port, config.baud
    );
    let port = link::open_port(&config.port, config.baud)?;

    let (tx, mut rx) = watch::channel(RobotCommand::default());
    link::spawn_intake(port, tx);

    actuators.initialize();

    let mut runtime = Runtime::new(&config);
    let mut tick = interval(config.loop_period());

    match config.watchdog_timeout() {
        Some(timeout) => info!(
            "Runtime started: {}Hz loop, {}ms watchdog timeout",
            config.loop_hz,
            timeout.as_millis()
        ),
        None => info!(
            "Runtime started: {}Hz loop, watchdog disabled",
            config.loop_hz
        ),
    }

    loop {
        tick.tick().await;

        // An Err here means the intake task is gone
        rx.has_changed()?;
        let cmd = runtime.take_latest(&mut rx);

        runtime.tick(&cmd, &mut actuators);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::flags;
    use crate::link::PacketDecoder;

    struct Rig {
        out: Actuators,
        left: SimDriveMotor,
        right: SimDriveMotor,
        lift: SimDriveMotor,
        rotation: SimPwm,
        chin: SimPwm,
    }

    /// Simulated actuators plus handles to observe them from the outside.
    fn rig() -> Rig {
        let left = SimDriveMotor::new("left_wheel");
        let right = SimDriveMotor::new("right_wheel");
        let lift = SimDriveMotor::new("lift");
        let rotation = SimPwm::new("rotation");
        let chin = SimPwm::new("chin");
        let out = Actuators {
            left_wheel: Box::new(left.clone()),
            right_wheel: Box::new(right.clone()),
            lift: Box::new(lift.clone()),
            rotation: Box::new(rotation.clone()),
            chin: Box::new(chin.clone()),
        };
        Rig {
            out,
            left,
            right,
            lift,
            rotation,
            chin,
        }
    }

    fn cmd_with_extended(extended: u8) -> RobotCommand {
        RobotCommand {
            extended,
            ..RobotCommand::default()
        }
    }

    #[test]
    fn test_initialize_applies_peripheral_setup() {
        let mut r = rig();
        r.out.initialize();

        assert_eq!(r.left.state().refresh_period, MOTOR_REFRESH_PERIOD);
        assert_eq!(r.right.state().refresh_period, MOTOR_REFRESH_PERIOD);
        assert_eq!(r.lift.state().refresh_period, MOTOR_REFRESH_PERIOD);
        assert_eq!(r.rotation.state().period, SERVO_PERIOD);
        assert_eq!(r.chin.state().period, SERVO_PERIOD);
    }

    #[test]
    fn test_step_moves_all_actuators_toward_command() {
        let config = RuntimeConfig::default();
        let mut cycle = ControlCycle::new(&config);
        let mut r = rig();

        // Strafe left; default axes (rot_x = 0x80, chin = 0x00)
        cycle.step(&cmd_with_extended(flags::MOVE_LEFT), &mut r.out);

        assert_eq!(r.left.state().level, 0.3);
        assert_eq!(r.right.state().level, 0.0);
        assert_eq!(r.lift.state().level, 0.0);
        // Stock rotation mapping sends 0x80 to max: 1530 + (2038 - 1530) * 0.2
        assert_eq!(r.rotation.state().pulse_width, Duration::from_micros(1632));
        // Chin target equals its starting pulse
        assert_eq!(r.chin.state().pulse_width, Duration::from_micros(1338));
    }

    #[test]
    fn test_reverse_drives_wheels_mirrored() {
        let config = RuntimeConfig::default();
        let mut cycle = ControlCycle::new(&config);
        let mut r = rig();

        cycle.step(&cmd_with_extended(flags::REVERSE), &mut r.out);
        assert_eq!(r.left.state().level, -0.3);
        assert_eq!(r.right.state().level, 0.3);
    }

    #[test]
    fn test_stale_step_decays_wheels_and_holds_servos() {
        let config = RuntimeConfig::default();
        let mut cycle = ControlCycle::new(&config);
        let mut r = rig();

        cycle.step(&cmd_with_extended(flags::MOVE_LEFT), &mut r.out);
        let held_rotation = r.rotation.state().pulse_width;

        cycle.step_stale(&mut r.out);
        // 0.3 + (0.0 - 0.3) * 0.3
        assert!((r.left.state().level - 0.21).abs() < 1e-6);
        assert_eq!(r.rotation.state().pulse_width, held_rotation);
        assert_eq!(r.chin.state().pulse_width, Duration::from_micros(1338));
    }

    #[test]
    fn test_watchdog_disabled_never_goes_stale() {
        let config = RuntimeConfig::default();
        let mut runtime = Runtime::new(&config);
        let mut r = rig();

        // No command ever received, yet the default command keeps standing
        runtime.tick(&RobotCommand::default(), &mut r.out);
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
    }

    #[test]
    fn test_watchdog_stale_until_first_command() {
        let mut config = RuntimeConfig::default();
        config.watchdog_timeout_ms = Some(3_600_000);
        let mut runtime = Runtime::new(&config);
        let mut r = rig();

        let cmd = cmd_with_extended(flags::MOVE_LEFT);
        runtime.tick(&cmd, &mut r.out);
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        assert_eq!(r.left.state().level, 0.0);

        runtime.on_command();
        runtime.tick(&cmd, &mut r.out);
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert_eq!(r.left.state().level, 0.3);
    }

    #[test]
    fn test_watchdog_trips_on_old_command() {
        let mut config = RuntimeConfig::default();
        config.watchdog_timeout_ms = Some(0);
        let mut runtime = Runtime::new(&config);
        let mut r = rig();

        runtime.on_command();
        std::thread::sleep(Duration::from_millis(5));

        runtime.tick(&cmd_with_extended(flags::MOVE_LEFT), &mut r.out);
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        assert_eq!(r.left.state().level, 0.0);
    }

    #[test]
    fn test_freshness_stamped_at_the_borrow() {
        let mut config = RuntimeConfig::default();
        config.watchdog_timeout_ms = Some(3_600_000);
        let mut runtime = Runtime::new(&config);
        let mut r = rig();

        let (tx, mut rx) = watch::channel(RobotCommand::default());

        // The pre-seeded initial value does not count as a received command
        let cmd = runtime.take_latest(&mut rx);
        runtime.tick(&cmd, &mut r.out);
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);

        // A command landing between loop steps is stamped by the same borrow
        // that consumes it
        tx.send(cmd_with_extended(flags::MOVE_LEFT)).unwrap();
        let cmd = runtime.take_latest(&mut rx);
        runtime.tick(&cmd, &mut r.out);
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert_eq!(r.left.state().level, 0.3);

        // Quiet channel: the stamp and the command both stand
        let cmd = runtime.take_latest(&mut rx);
        runtime.tick(&cmd, &mut r.out);
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert!((r.left.state().level - 0.51).abs() < 1e-6);
    }

    #[test]
    fn test_decoded_packet_drives_wheels_end_to_end() {
        let config = RuntimeConfig::default();
        let mut cycle = ControlCycle::new(&config);
        let mut r = rig();

        // Reverse wins over the strafe bit
        let sent = cmd_with_extended(flags::REVERSE | flags::MOVE_LEFT);
        let mut decoder = PacketDecoder::new();
        let mut decoded = None;
        for byte in crate::link::encode(&sent) {
            if let Some(cmd) = decoder.push(byte) {
                decoded = Some(cmd);
            }
        }
        let decoded = decoded.expect("encoded packet must decode");

        cycle.step(&decoded, &mut r.out);
        assert_eq!(r.left.state().level, -0.3);
        assert_eq!(r.right.state().level, 0.3);
    }
}
