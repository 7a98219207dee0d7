// First-order smoothing toward a commanded setpoint.
//
// All five actuators share one update rule:
//
//   next = current + (target - current) * gain       gain in (0, 1]
//
// Wheels and the lift read `current` back from their driver each cycle, so
// external clamping is tracked; the two servo joints carry their own running
// pulse width because PWM outputs are write-only.

use super::hal::DriveMotor;

/// The shared exponential-convergence rule. Gain is a fixed tuning constant
/// per actuator; values outside (0, 1] are rejected at configuration load.
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    gain: f32,
}

impl Smoother {
    pub fn new(gain: f32) -> Self {
        debug_assert!(gain > 0.0 && gain <= 1.0, "gain {gain} outside (0, 1]");
        Self { gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// One smoothing step. Applies no saturation: callers map targets into
    /// the safe physical range before stepping.
    pub fn step(&self, current: f32, target: f32) -> f32 {
        current + (target - current) * self.gain
    }
}

/// Smoothing for a feedback-capable drive motor: reads the driver's last
/// level, steps toward the target, writes the result back.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedDrive {
    smoother: Smoother,
}

impl SmoothedDrive {
    pub fn new(gain: f32) -> Self {
        Self {
            smoother: Smoother::new(gain),
        }
    }

    pub fn update(&self, motor: &mut dyn DriveMotor, target: f32) {
        let current = motor.level();
        motor.drive(self.smoother.step(current, target));
    }
}

/// Smoothing for a write-only PWM joint: the running pulse width lives here.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedPulse {
    smoother: Smoother,
    current_us: f32,
}

impl SmoothedPulse {
    pub fn new(gain: f32, initial_us: f32) -> Self {
        Self {
            smoother: Smoother::new(gain),
            current_us: initial_us,
        }
    }

    /// Step toward `target_us` and return the new pulse width to emit.
    pub fn update(&mut self, target_us: f32) -> f32 {
        self.current_us = self.smoother.step(self.current_us, target_us);
        self.current_us
    }

    pub fn current_us(&self) -> f32 {
        self.current_us
    }
}
