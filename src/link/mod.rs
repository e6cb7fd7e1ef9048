//! # Propulsion Link Module
//!
//! Packet codec and duplex pump between the flight computer and the
//! propulsion board.
//!
//! This module handles:
//! - Q9.6 fixed-point quantization of physical values
//! - Byte-exact command (downlink) and status (uplink) packet layouts
//! - Per-role mapping between packets and the object dictionary
//! - Non-blocking transmit/receive over a shared serial channel

pub mod fixed_point;
pub mod packet;
pub mod role;
pub mod pump;

pub use packet::{DownlinkPacket, UplinkPacket, WirePacket, MAX_PACKET_SIZE, PROP_BOARD_ID};
pub use pump::{DuplexPump, LinkStats};
pub use role::{AvionicsRole, LinkRole, PropulsionRole};
