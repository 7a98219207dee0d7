// Command state shared between the link decoder and the control loop.
//
// A RobotCommand is built wholesale by the decoder when a packet passes its
// checksum and is never mutated afterwards; the control loop only ever sees
// complete snapshots.

/// Bit layout of the extended flags byte (packet byte 1).
pub mod flags {
    /// Reverse: both wheels run backwards regardless of the move bits.
    pub const REVERSE: u8 = 1 << 6;
    /// Move direction, left wheel contribution.
    pub const MOVE_LEFT: u8 = 1 << 4;
    /// Move direction, right wheel contribution.
    pub const MOVE_RIGHT: u8 = 1 << 5;
    /// Lift direction code, 2 bits.
    pub const LIFT_SHIFT: u8 = 2;
    pub const LIFT_MASK: u8 = 0b11 << LIFT_SHIFT;
    /// Lift code 0b01: up.
    pub const LIFT_UP: u8 = 0b01 << LIFT_SHIFT;
    /// Lift code 0b10: down.
    pub const LIFT_DOWN: u8 = 0b10 << LIFT_SHIFT;
    /// Encoder lock: freeze chin/rot axes on this packet (drive still updates).
    pub const ENCODER_LOCK: u8 = 1 << 1;
}

/// The most recently validated command fields.
///
/// `extended` is refreshed by every checksum-valid packet. The four axis bytes
/// are refreshed only when the packet's encoder-lock bit is clear; a locked
/// packet carries the previous values forward. Drive and lift targets are
/// derived from `extended` on demand, so they follow every accepted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotCommand {
    /// Raw extended flags byte, last accepted.
    pub extended: u8,
    /// Chin joint position, raw count.
    pub chin: u8,
    /// Neck rotation position, raw count (drives the rotation servo).
    pub rot_x: u8,
    /// Spare rotation axis, stored but not actuated.
    pub rot_y: u8,
    /// Spare rotation axis, stored but not actuated.
    pub rot_z: u8,
}

impl Default for RobotCommand {
    /// Power-on command: everything stopped, rotation axes centered.
    fn default() -> Self {
        Self {
            extended: 0x00,
            chin: 0x00,
            rot_x: 0x80,
            rot_y: 0x00,
            rot_z: 0x80,
        }
    }
}

impl RobotCommand {
    pub fn reverse(&self) -> bool {
        self.extended & flags::REVERSE != 0
    }

    pub fn encoder_lock(&self) -> bool {
        self.extended & flags::ENCODER_LOCK != 0
    }

    pub fn move_left(&self) -> bool {
        self.extended & flags::MOVE_LEFT != 0
    }

    pub fn move_right(&self) -> bool {
        self.extended & flags::MOVE_RIGHT != 0
    }

    /// Left wheel setpoint in [-1, 1].
    ///
    /// Reverse wins over the move bits; the pair of move bits lets the
    /// transmitter drive each wheel independently for turning.
    pub fn left_wheel_target(&self) -> f32 {
        if self.reverse() {
            -1.0
        } else if self.move_left() {
            1.0
        } else {
            0.0
        }
    }

    /// Right wheel setpoint in [-1, 1]. The right motor is mounted mirrored,
    /// so its forward contribution is negative and reverse is positive.
    pub fn right_wheel_target(&self) -> f32 {
        if self.reverse() {
            1.0
        } else if self.move_right() {
            -1.0
        } else {
            0.0
        }
    }

    /// Lift setpoint: +1 up, -1 down, 0 stop.
    ///
    /// The 2-bit code on the wire is 0b01 = up, 0b10 = down; 0b00 and the
    /// unused 0b11 both stop the lift.
    pub fn lift_target(&self) -> f32 {
        match self.extended & flags::LIFT_MASK {
            x if x == flags::LIFT_UP => 1.0,
            x if x == flags::LIFT_DOWN => -1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(extended: u8) -> RobotCommand {
        RobotCommand {
            extended,
            ..RobotCommand::default()
        }
    }

    #[test]
    fn test_default_is_stopped() {
        let c = RobotCommand::default();
        assert_eq!(c.left_wheel_target(), 0.0);
        assert_eq!(c.right_wheel_target(), 0.0);
        assert_eq!(c.lift_target(), 0.0);
        assert!(!c.encoder_lock());
        // Rotation axes power on centered
        assert_eq!(c.rot_x, 0x80);
        assert_eq!(c.rot_z, 0x80);
    }

    #[test]
    fn test_move_left_only() {
        // reverse clear, move = 01 -> left forward, right idle
        let c = cmd(0b0001_0000);
        assert_eq!(c.left_wheel_target(), 1.0);
        assert_eq!(c.right_wheel_target(), 0.0);
    }

    #[test]
    fn test_move_both_wheels() {
        let c = cmd(flags::MOVE_LEFT | flags::MOVE_RIGHT);
        assert_eq!(c.left_wheel_target(), 1.0);
        // Mirrored mount: the right wheel drives forward with -1
        assert_eq!(c.right_wheel_target(), -1.0);
    }

    #[test]
    fn test_reverse_overrides_move_bits() {
        let c = cmd(flags::REVERSE | flags::MOVE_LEFT | flags::MOVE_RIGHT);
        assert_eq!(c.left_wheel_target(), -1.0);
        assert_eq!(c.right_wheel_target(), 1.0);
    }

    #[test]
    fn test_lift_codes() {
        assert_eq!(cmd(0b0000_0100).lift_target(), 1.0); // bits 3-2 = 01
        assert_eq!(cmd(0b0000_1000).lift_target(), -1.0); // bits 3-2 = 10
        assert_eq!(cmd(0b0000_0000).lift_target(), 0.0);
        assert_eq!(cmd(0b0000_1100).lift_target(), 0.0); // unused code 11
    }

    #[test]
    fn test_encoder_lock_bit() {
        assert!(cmd(flags::ENCODER_LOCK).encoder_lock());
        assert!(!cmd(0x00).encoder_lock());
        // Lock is bit 1 only; neighbours don't trigger it
        assert!(!cmd(0b0000_0001).encoder_lock());
        assert!(!cmd(0b0000_0100).encoder_lock());
    }
}
