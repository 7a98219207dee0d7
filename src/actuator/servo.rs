// Raw axis counts to servo pulse-width targets.
//
// Pulse ranges and scale factors are calibration constants carried in the
// runtime configuration (defaults in `config`).

use crate::config::ServoRange;

/// Rotation joint target in microseconds.
///
/// Stock behavior: any computed value above `min_us` is reassigned to
/// `max_us`, which makes the joint two-position (min when rot_x = 0, max
/// otherwise) - deployed remotes expect this. With `corrected_clamp` the
/// mapping is linear with a normal upper clamp.
pub fn rotation_pulse_target(rot_x: u8, range: &ServoRange, corrected_clamp: bool) -> f32 {
    let computed = range.min_us + f32::from(rot_x) * range.us_per_count;
    if corrected_clamp {
        computed.min(range.max_us)
    } else if computed > range.min_us {
        range.max_us
    } else {
        computed
    }
}

/// Chin joint target in microseconds: linear with an upper clamp.
pub fn chin_pulse_target(chin: u8, range: &ServoRange) -> f32 {
    (range.min_us + f32::from(chin) * range.us_per_count).min(range.max_us)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn rotation_range() -> ServoRange {
        config::RuntimeConfig::default().rotation
    }

    fn chin_range() -> ServoRange {
        config::RuntimeConfig::default().chin
    }

    #[test]
    fn test_rotation_stock_mapping_is_two_position() {
        let r = rotation_range();
        assert_eq!(rotation_pulse_target(0, &r, false), 1022.0);
        // Even one count above zero jumps the joint to max
        assert_eq!(rotation_pulse_target(1, &r, false), 2038.0);
        assert_eq!(rotation_pulse_target(0x80, &r, false), 2038.0);
        assert_eq!(rotation_pulse_target(254, &r, false), 2038.0);
    }

    #[test]
    fn test_rotation_corrected_mapping_is_linear() {
        let r = rotation_range();
        assert_eq!(rotation_pulse_target(0, &r, true), 1022.0);
        assert_eq!(rotation_pulse_target(1, &r, true), 1026.0);
        assert_eq!(rotation_pulse_target(0x80, &r, true), 1534.0);
        // 1022 + 254 * 4 = 2038: the top of the wire range lands on max
        assert_eq!(rotation_pulse_target(254, &r, true), 2038.0);
        assert_eq!(rotation_pulse_target(255, &r, true), 2038.0);
    }

    #[test]
    fn test_chin_mapping_clamps_at_max() {
        let r = chin_range();
        assert_eq!(chin_pulse_target(0, &r), 1338.0);
        assert_eq!(chin_pulse_target(100, &r), 1638.0);
        // 1338 + 254 * 3 = 2100 exactly
        assert_eq!(chin_pulse_target(254, &r), 2100.0);
        assert_eq!(chin_pulse_target(255, &r), 2100.0);
    }
}
