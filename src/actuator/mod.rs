// Actuator module for the Meerkat teleop head
//
// Provides:
// - Hardware traits for drive motors and servo PWM outputs, with simulated
//   implementations for running without hardware
// - First-order smoothing toward commanded setpoints
// - Raw axis count -> servo pulse-width mapping

pub mod hal;
mod servo;
mod smoothing;

pub use hal::{DriveMotor, DriveMotorState, PwmOutput, PwmState, SimDriveMotor, SimPwm};
pub use servo::{chin_pulse_target, rotation_pulse_target};
pub use smoothing::{SmoothedDrive, SmoothedPulse, Smoother};
