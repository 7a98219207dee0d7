// Teleop packet decoding and encoding for the XBee link.
//
// Wire format (7 bytes, fixed):
//   [0xFF sync, extended, chin, rotY, rotX, rotZ, checksum]
// The sync byte is not checksummed; checksum is the sum of the five payload
// bytes mod 256.

use crate::command::{flags, RobotCommand};

/// Packet start marker, also the resynchronization point after corruption.
pub const SYNC_BYTE: u8 = 0xFF;

/// Full packet size on the wire.
pub const PACKET_LEN: usize = 7;

/// Payload bytes between sync and checksum.
pub const PAYLOAD_LEN: usize = 5;

/// Where the decoder is within the current packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Next byte opens a packet. Any value is consumed as the sync marker;
    /// real resynchronization happens through the 0xFF rule in `push`.
    AwaitSync,
    /// Next byte is payload slot 0..=4: extended, chin, rotY, rotX, rotZ.
    Payload(u8),
    /// Next byte is the checksum.
    Check,
}

/// Byte-at-a-time decoder for the teleop packet stream.
///
/// Feed every received byte to [`push`](Self::push); it returns a fully
/// validated [`RobotCommand`] exactly when a checksum byte closes a good
/// packet, and `None` otherwise. A corrupt packet produces no command and no
/// error: the decoder simply realigns on the next sync byte.
#[derive(Debug)]
pub struct PacketDecoder {
    state: DecodeState,
    payload: [u8; PAYLOAD_LEN],
    checksum: u8,
    last: RobotCommand,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::AwaitSync,
            payload: [0; PAYLOAD_LEN],
            checksum: 0,
            last: RobotCommand::default(),
        }
    }

    /// The most recently validated command (power-on default before any
    /// packet has been accepted).
    pub fn last_command(&self) -> RobotCommand {
        self.last
    }

    /// Process one received byte.
    ///
    /// A sync byte aborts whatever was in flight and opens a new packet in the
    /// same step, so the stream realigns at the next packet boundary no matter
    /// where corruption happened.
    pub fn push(&mut self, byte: u8) -> Option<RobotCommand> {
        if byte == SYNC_BYTE {
            self.state = DecodeState::AwaitSync;
        }

        match self.state {
            DecodeState::AwaitSync => {
                self.checksum = 0;
                self.state = DecodeState::Payload(0);
                None
            }
            DecodeState::Payload(slot) => {
                self.payload[slot as usize] = byte;
                self.checksum = self.checksum.wrapping_add(byte);
                self.state = if slot as usize == PAYLOAD_LEN - 1 {
                    DecodeState::Check
                } else {
                    DecodeState::Payload(slot + 1)
                };
                None
            }
            DecodeState::Check => {
                self.state = DecodeState::AwaitSync;
                if checksum_matches(self.checksum, byte) {
                    self.last = self.commit();
                    Some(self.last)
                } else {
                    None
                }
            }
        }
    }

    /// Build the new command from the pooled payload. The extended byte is
    /// always taken; the four axis bytes are taken only when the packet's
    /// encoder-lock bit is clear, otherwise the previous values carry over.
    fn commit(&self) -> RobotCommand {
        let extended = self.payload[0];
        if extended & flags::ENCODER_LOCK != 0 {
            RobotCommand {
                extended,
                ..self.last
            }
        } else {
            RobotCommand {
                extended,
                chin: self.payload[1],
                rot_y: self.payload[2],
                rot_x: self.payload[3],
                rot_z: self.payload[4],
            }
        }
    }
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Checksum acceptance rule.
///
/// A payload summing to 0xFF would put a bare sync byte in the checksum slot
/// and desynchronize the receiver, so the transmitter sends 0xFE in that case;
/// 0xFF/0xFE is accepted here to match.
fn checksum_matches(sum: u8, received: u8) -> bool {
    sum == received || (sum == 0xFF && received == 0xFE)
}

/// Encode a command into its 7-byte wire form.
///
/// Payload bytes equal to the sync marker are substituted with 0xFE (a 0xFF
/// payload byte cannot travel on this link), and a checksum of 0xFF is emitted
/// as 0xFE per the rule in [`checksum_matches`].
pub fn encode(cmd: &RobotCommand) -> [u8; PACKET_LEN] {
    // Wire payload order: extended, chin, rotY, rotX, rotZ
    let payload = [cmd.extended, cmd.chin, cmd.rot_y, cmd.rot_x, cmd.rot_z]
        .map(|b| if b == SYNC_BYTE { 0xFE } else { b });

    let sum = payload
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    let checksum = if sum == 0xFF { 0xFE } else { sum };

    [
        SYNC_BYTE, payload[0], payload[1], payload[2], payload[3], payload[4], checksum,
    ]
}
