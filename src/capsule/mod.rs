//! # Capsule Framing Module
//!
//! Default transport underneath the packet pump.
//!
//! This module handles:
//! - Preamble + id + length + CRC-8/DVB-S2 capsule framing
//! - Zero-allocation encoding into caller buffers
//! - Incremental, resynchronising decoding

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;

pub use decoder::CapsuleDecoder;
pub use protocol::{Frame, FrameCodec};

use crate::error::Result;

/// [`FrameCodec`] backed by the capsule encoder and decoder
#[derive(Debug, Default)]
pub struct CapsuleCodec {
    decoder: CapsuleDecoder,
}

impl CapsuleCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec whose decoder rejects payloads longer than `max_payload`
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            decoder: CapsuleDecoder::with_max_payload(max_payload),
        }
    }
}

impl FrameCodec for CapsuleCodec {
    fn encoded_len(&self, payload_len: usize) -> usize {
        encoder::capsule_len(payload_len)
    }

    fn encode(&self, packet_id: u8, payload: &[u8], out: &mut [u8]) -> Result<usize> {
        encoder::encode_capsule(packet_id, payload, out)
    }

    fn decode(&mut self, byte: u8) -> Option<Frame<'_>> {
        self.decoder.push(byte)
    }

    fn crc_errors(&self) -> u32 {
        self.decoder.crc_errors()
    }

    fn length_errors(&self) -> u32 {
        self.decoder.length_errors()
    }
}
