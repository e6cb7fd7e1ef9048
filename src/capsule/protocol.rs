//! # Capsule Protocol Constants and Types
//!
//! Wire layout of a capsule:
//!
//! ```text
//! +------+------+-----------+-----+-------------+------+
//! | 0xFF | 0xFA | packet id | len | payload[len]| crc8 |
//! +------+------+-----------+-----+-------------+------+
//! ```
//!
//! The CRC covers packet id, length and payload.

use crate::error::Result;

/// First preamble byte
pub const CAPSULE_PREAMBLE_A: u8 = 0xFF;

/// Second preamble byte
pub const CAPSULE_PREAMBLE_B: u8 = 0xFA;

/// Bytes a capsule adds around its payload: preamble(2) + id(1) + len(1) + crc(1)
pub const CAPSULE_OVERHEAD: usize = 5;

/// Largest payload a one-byte length field can describe
pub const CAPSULE_MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

/// A completed frame handed out by the incremental decoder.
///
/// The payload borrows the decoder's buffer and is only valid until the
/// next byte is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub packet_id: u8,
    pub payload: &'a [u8],
}

impl Frame<'_> {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Byte framing and error detection used underneath the packet pump.
///
/// The pump only relies on these three operations, so any transport with
/// a deterministic encoded length can be substituted.
pub trait FrameCodec {
    /// Number of bytes a payload of `payload_len` occupies once framed
    fn encoded_len(&self, payload_len: usize) -> usize;

    /// Frame `payload` into `out`, returning the number of bytes written
    ///
    /// # Errors
    ///
    /// Returns error if the payload is too large for the transport or `out`
    /// cannot hold the framed bytes.
    fn encode(&self, packet_id: u8, payload: &[u8], out: &mut [u8]) -> Result<usize>;

    /// Feed one received byte; yields a frame when it completes a valid one
    fn decode(&mut self, byte: u8) -> Option<Frame<'_>>;

    /// Frames rejected by error detection so far
    fn crc_errors(&self) -> u32 {
        0
    }

    /// Frames abandoned because their announced length was out of range
    fn length_errors(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_constants() {
        assert_eq!(CAPSULE_PREAMBLE_A, 0xFF);
        assert_eq!(CAPSULE_PREAMBLE_B, 0xFA);
        assert_eq!(CAPSULE_OVERHEAD, 5);
        assert_eq!(CAPSULE_MAX_PAYLOAD_SIZE, 255);
    }

    #[test]
    fn test_frame_len() {
        let bytes = [1u8, 2, 3];
        let frame = Frame {
            packet_id: 46,
            payload: &bytes,
        };
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
    }
}
