//! # Capsule Encoder
//!
//! Frames a payload into a caller-owned buffer without allocating.

use super::crc::Crc8;
use super::protocol::*;
use crate::error::{PropLinkError, Result};

/// Encoded length of a capsule carrying `payload_len` bytes
pub const fn capsule_len(payload_len: usize) -> usize {
    payload_len + CAPSULE_OVERHEAD
}

/// Encode one capsule into `out`
///
/// # Arguments
///
/// * `packet_id` - Packet type identifier
/// * `payload` - Raw payload bytes (at most 255)
/// * `out` - Destination buffer, at least `capsule_len(payload.len())` long
///
/// # Returns
///
/// * `Result<usize>` - Number of bytes written
///
/// # Examples
///
/// ```
/// use prop_link::capsule::encoder::{capsule_len, encode_capsule};
///
/// let mut out = [0u8; 16];
/// let n = encode_capsule(46, &[0x01, 0x02], &mut out).unwrap();
/// assert_eq!(n, capsule_len(2));
/// assert_eq!(&out[..4], &[0xFF, 0xFA, 46, 2]);
/// ```
pub fn encode_capsule(packet_id: u8, payload: &[u8], out: &mut [u8]) -> Result<usize> {
    if payload.len() > CAPSULE_MAX_PAYLOAD_SIZE {
        return Err(PropLinkError::Capsule(format!(
            "Payload size {} exceeds maximum {}",
            payload.len(),
            CAPSULE_MAX_PAYLOAD_SIZE
        )));
    }

    let total = capsule_len(payload.len());
    if out.len() < total {
        return Err(PropLinkError::Capsule(format!(
            "Output buffer too small: need {} bytes, have {}",
            total,
            out.len()
        )));
    }

    let len = payload.len() as u8;
    out[0] = CAPSULE_PREAMBLE_A;
    out[1] = CAPSULE_PREAMBLE_B;
    out[2] = packet_id;
    out[3] = len;
    out[4..4 + payload.len()].copy_from_slice(payload);

    let mut crc = Crc8::new();
    for &byte in &out[2..4 + payload.len()] {
        crc.update(byte);
    }
    out[total - 1] = crc.value();

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::crc::crc8;

    #[test]
    fn test_capsule_len() {
        assert_eq!(capsule_len(0), 5);
        assert_eq!(capsule_len(16), 21);
        assert_eq!(capsule_len(28), 33);
    }

    #[test]
    fn test_encode_layout() {
        let payload = [0xAA, 0xBB, 0xCC];
        let mut out = [0u8; 8];
        let n = encode_capsule(7, &payload, &mut out).unwrap();

        assert_eq!(n, 8);
        assert_eq!(out[0], CAPSULE_PREAMBLE_A);
        assert_eq!(out[1], CAPSULE_PREAMBLE_B);
        assert_eq!(out[2], 7);
        assert_eq!(out[3], 3);
        assert_eq!(&out[4..7], &payload);
        assert_eq!(out[7], crc8(&[7, 3, 0xAA, 0xBB, 0xCC]));
    }

    #[test]
    fn test_encode_empty_payload() {
        let mut out = [0u8; 5];
        let n = encode_capsule(46, &[], &mut out).unwrap();
        assert_eq!(n, 5);
        assert_eq!(out[3], 0);
        assert_eq!(out[4], crc8(&[46, 0]));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = [0u8; 256];
        let mut out = [0u8; 300];
        assert!(encode_capsule(46, &payload, &mut out).is_err());
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        let mut out = [0u8; 6];
        let result = encode_capsule(46, &[1, 2], &mut out);
        match result {
            Err(PropLinkError::Capsule(msg)) => assert!(msg.contains("too small")),
            other => panic!("Expected Capsule error, got: {:?}", other),
        }
    }

    #[test]
    fn test_encode_max_payload() {
        let payload = [0x5Au8; CAPSULE_MAX_PAYLOAD_SIZE];
        let mut out = [0u8; CAPSULE_MAX_PAYLOAD_SIZE + CAPSULE_OVERHEAD];
        let n = encode_capsule(1, &payload, &mut out).unwrap();
        assert_eq!(n, 260);
        assert_eq!(out[3], 255);
    }

    #[test]
    fn test_different_payload_different_crc() {
        let mut a = [0u8; 7];
        let mut b = [0u8; 7];
        encode_capsule(46, &[0x00, 0x10], &mut a).unwrap();
        encode_capsule(46, &[0x00, 0x11], &mut b).unwrap();
        assert_ne!(a[6], b[6]);
    }
}
