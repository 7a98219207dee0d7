// Teleop link module for the Meerkat XBee receiver
//
// Provides:
// - 7-byte packet framing, checksum validation and command decoding
// - Packet encoding for transmitter-side tools
// - Blocking serial intake feeding the runtime's command channel

pub mod protocol;
mod reader;

pub use protocol::{encode, PacketDecoder, PACKET_LEN, PAYLOAD_LEN, SYNC_BYTE};
pub use reader::{open_port, spawn_intake, LinkError, DEFAULT_TIMEOUT_MS};
