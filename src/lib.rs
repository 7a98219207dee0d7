// Meerkat teleop receiver: XBee packet link, command decoding and the
// five-actuator control loop.

pub mod actuator;
pub mod command;
pub mod config;
pub mod link;
pub mod runtime;
