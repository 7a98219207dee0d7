// Tuning constants, link defaults, runtime configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Control loop frequency
pub const LOOP_HZ: u64 = 200;
// Highest accepted loop rate: loop_period() resolves whole microseconds, so
// anything past 1 MHz would collapse the period to zero
pub const MAX_LOOP_HZ: u64 = 1_000_000;

// XBee link: serial device and radio baud rate
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const XBEE_BAUD: u32 = 230_400;

// Smoothing gains (per-actuator tuning constants, not derived)
pub const WHEELS_GAIN: f32 = 0.3;
pub const LIFT_GAIN: f32 = 0.5;
pub const ROTATION_GAIN: f32 = 0.2;
pub const CHIN_GAIN: f32 = 0.2;

// Output peripheral setup applied at startup
pub const MOTOR_REFRESH_PERIOD: Duration = Duration::from_micros(500);
pub const SERVO_PERIOD: Duration = Duration::from_millis(20);

// Calibrated servo ranges
pub const ROTATION_RANGE: ServoRange = ServoRange {
    min_us: 1022.0,
    max_us: 2038.0,
    us_per_count: 4.0,
    neutral_us: 1530.0,
};
pub const CHIN_RANGE: ServoRange = ServoRange {
    min_us: 1338.0,
    max_us: 2100.0,
    us_per_count: 3.0,
    neutral_us: 1338.0,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gain for {actuator} is {gain}, must be in (0, 1]")]
    GainOutOfRange { actuator: &'static str, gain: f32 },

    #[error("Servo range for {joint} is invalid: {reason}")]
    InvalidServoRange { joint: &'static str, reason: String },

    #[error("Loop rate {hz} Hz outside [1, 1000000]")]
    InvalidLoopRate { hz: u64 },
}

/// Calibration of one servo joint: pulse range, scale and power-on pulse,
/// all in microseconds (`us_per_count` in microseconds per raw count).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServoRange {
    pub min_us: f32,
    pub max_us: f32,
    pub us_per_count: f32,
    pub neutral_us: f32,
}

/// Smoothing gain per actuator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Gains {
    pub wheels: f32,
    pub lift: f32,
    pub rotation: f32,
    pub chin: f32,
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            wheels: WHEELS_GAIN,
            lift: LIFT_GAIN,
            rotation: ROTATION_GAIN,
            chin: CHIN_GAIN,
        }
    }
}

/// Complete runtime configuration. Every field has a calibrated default, so a
/// config file only needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Serial device carrying the teleop packets.
    pub port: String,
    pub baud: u32,
    pub loop_hz: u64,
    /// Stop wheels and lift when no packet arrived for this long.
    /// `None` (the default) holds the last command forever.
    pub watchdog_timeout_ms: Option<u64>,
    /// Replace the stock two-position rotation mapping with a linear clamp.
    pub corrected_rotation_clamp: bool,
    pub gains: Gains,
    pub rotation: ServoRange,
    pub chin: ServoRange,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud: XBEE_BAUD,
            loop_hz: LOOP_HZ,
            watchdog_timeout_ms: None,
            corrected_rotation_clamp: false,
            gains: Gains::default(),
            rotation: ROTATION_RANGE,
            chin: CHIN_RANGE,
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON config; unspecified fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_hz == 0 || self.loop_hz > MAX_LOOP_HZ {
            return Err(ConfigError::InvalidLoopRate { hz: self.loop_hz });
        }
        for (actuator, gain) in [
            ("wheels", self.gains.wheels),
            ("lift", self.gains.lift),
            ("rotation", self.gains.rotation),
            ("chin", self.gains.chin),
        ] {
            if !(gain > 0.0 && gain <= 1.0) {
                return Err(ConfigError::GainOutOfRange { actuator, gain });
            }
        }
        validate_range("rotation", &self.rotation)?;
        validate_range("chin", &self.chin)?;
        Ok(())
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.loop_hz)
    }

    pub fn watchdog_timeout(&self) -> Option<Duration> {
        self.watchdog_timeout_ms.map(Duration::from_millis)
    }
}

fn validate_range(joint: &'static str, range: &ServoRange) -> Result<(), ConfigError> {
    if !(range.min_us < range.max_us) {
        return Err(ConfigError::InvalidServoRange {
            joint,
            reason: format!("min {} is not below max {}", range.min_us, range.max_us),
        });
    }
    if !(range.us_per_count > 0.0) {
        return Err(ConfigError::InvalidServoRange {
            joint,
            reason: format!("scale {} must be positive", range.us_per_count),
        });
    }
    if range.neutral_us < range.min_us || range.neutral_us > range.max_us {
        return Err(ConfigError::InvalidServoRange {
            joint,
            reason: format!(
                "neutral {} outside [{}, {}]",
                range.neutral_us, range.min_us, range.max_us
            ),
        });
    }
    Ok(())
}
