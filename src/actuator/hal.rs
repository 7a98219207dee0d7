// Hardware traits for the five actuators, plus simulated implementations.
//
// The runtime only ever talks to these traits; real bindings (H-bridge
// drivers, servo PWM peripherals) are provided by the embedding application.
// The simulated types stand in when no hardware is attached and are what the
// tests drive.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;

/// A signed drive motor (wheels, lift).
///
/// `level` is in [-1, 1]. The driver remembers the last commanded level and
/// reports it through [`level`](Self::level); the smoothing controller reads
/// it back each cycle so that any clamping the driver applies is tracked.
pub trait DriveMotor {
    /// Output refresh period of the underlying driver.
    fn set_refresh_period(&mut self, period: Duration);

    /// Command a new drive level in [-1, 1].
    fn drive(&mut self, level: f32);

    /// Last commanded level (not a measured speed).
    fn level(&self) -> f32;
}

/// A write-only PWM output (rotation and chin servos).
pub trait PwmOutput {
    fn set_period(&mut self, period: Duration);
    fn set_pulse_width(&mut self, width: Duration);
}

// === Simulated implementations ===

#[derive(Debug, Clone, Copy, Default)]
pub struct DriveMotorState {
    pub level: f32,
    pub refresh_period: Duration,
}

/// Simulated drive motor. Clamps like a real H-bridge driver and keeps its
/// state behind an `Arc` so a cloned handle can observe it from outside.
#[derive(Debug, Clone)]
pub struct SimDriveMotor {
    label: &'static str,
    state: Arc<Mutex<DriveMotorState>>,
}

impl SimDriveMotor {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            state: Arc::new(Mutex::new(DriveMotorState::default())),
        }
    }

    pub fn state(&self) -> DriveMotorState {
        *self.state.lock().unwrap()
    }
}

impl DriveMotor for SimDriveMotor {
    fn set_refresh_period(&mut self, period: Duration) {
        self.state.lock().unwrap().refresh_period = period;
    }

    fn drive(&mut self, level: f32) {
        let clamped = level.clamp(-1.0, 1.0);
        trace!("sim motor {}: drive {:.3}", self.label, clamped);
        self.state.lock().unwrap().level = clamped;
    }

    fn level(&self) -> f32 {
        self.state.lock().unwrap().level
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PwmState {
    pub period: Duration,
    pub pulse_width: Duration,
}

/// Simulated PWM output with the same observable-handle shape as
/// [`SimDriveMotor`].
#[derive(Debug, Clone)]
pub struct SimPwm {
    label: &'static str,
    state: Arc<Mutex<PwmState>>,
}

impl SimPwm {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            state: Arc::new(Mutex::new(PwmState::default())),
        }
    }

    pub fn state(&self) -> PwmState {
        *self.state.lock().unwrap()
    }
}

impl PwmOutput for SimPwm {
    fn set_period(&mut self, period: Duration) {
        self.state.lock().unwrap().period = period;
    }

    fn set_pulse_width(&mut self, width: Duration) {
        trace!("sim pwm {}: pulse {:?}", self.label, width);
        self.state.lock().unwrap().pulse_width = width;
    }
}
