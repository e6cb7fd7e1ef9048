//! # Capsule Decoder
//!
//! Byte-at-a-time state machine that recovers capsules from a raw stream.
//! Garbage between capsules is skipped and a capsule with a bad checksum is
//! dropped, after which the decoder hunts for the next preamble. A length
//! byte above the configured maximum payload is treated as corruption and
//! sends the decoder straight back to the preamble hunt.

use super::crc::Crc8;
use super::protocol::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    PreambleA,
    PreambleB,
    PacketId,
    Length,
    Payload,
    Checksum,
}

/// Incremental capsule decoder with a fixed receive buffer
pub struct CapsuleDecoder {
    state: State,
    packet_id: u8,
    len: usize,
    filled: usize,
    max_payload: usize,
    crc: Crc8,
    buf: [u8; CAPSULE_MAX_PAYLOAD_SIZE],
    frames_decoded: u32,
    crc_errors: u32,
    length_errors: u32,
}

impl std::fmt::Debug for CapsuleDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapsuleDecoder")
            .field("state", &self.state)
            .field("frames_decoded", &self.frames_decoded)
            .field("max_payload", &self.max_payload)
            .field("crc_errors", &self.crc_errors)
            .field("length_errors", &self.length_errors)
            .finish_non_exhaustive()
    }
}

impl Default for CapsuleDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CapsuleDecoder {
    pub const fn new() -> Self {
        Self::with_max_payload(CAPSULE_MAX_PAYLOAD_SIZE)
    }

    /// Decoder that rejects capsules announcing more than `max_payload` bytes
    ///
    /// Values above [`CAPSULE_MAX_PAYLOAD_SIZE`] are clamped to it.
    pub const fn with_max_payload(max_payload: usize) -> Self {
        let max_payload = if max_payload > CAPSULE_MAX_PAYLOAD_SIZE {
            CAPSULE_MAX_PAYLOAD_SIZE
        } else {
            max_payload
        };

        Self {
            state: State::PreambleA,
            packet_id: 0,
            len: 0,
            filled: 0,
            max_payload,
            crc: Crc8::new(),
            buf: [0u8; CAPSULE_MAX_PAYLOAD_SIZE],
            frames_decoded: 0,
            crc_errors: 0,
            length_errors: 0,
        }
    }

    /// Feed one byte
    ///
    /// # Returns
    ///
    /// * `Option<Frame>` - The completed capsule if this byte was a valid checksum
    ///
    /// # Examples
    ///
    /// ```
    /// use prop_link::capsule::decoder::CapsuleDecoder;
    /// use prop_link::capsule::encoder::encode_capsule;
    ///
    /// let mut wire = [0u8; 8];
    /// let n = encode_capsule(46, &[1, 2, 3], &mut wire).unwrap();
    ///
    /// let mut decoder = CapsuleDecoder::new();
    /// let mut seen = None;
    /// for &b in &wire[..n] {
    ///     if let Some(frame) = decoder.push(b) {
    ///         seen = Some((frame.packet_id, frame.payload.to_vec()));
    ///     }
    /// }
    /// assert_eq!(seen, Some((46, vec![1, 2, 3])));
    /// ```
    pub fn push(&mut self, byte: u8) -> Option<Frame<'_>> {
        match self.state {
            State::PreambleA => {
                if byte == CAPSULE_PREAMBLE_A {
                    self.state = State::PreambleB;
                }
            }
            State::PreambleB => {
                if byte == CAPSULE_PREAMBLE_B {
                    self.state = State::PacketId;
                } else if byte != CAPSULE_PREAMBLE_A {
                    self.state = State::PreambleA;
                }
            }
            State::PacketId => {
                self.packet_id = byte;
                self.crc = Crc8::new();
                self.crc.update(byte);
                self.state = State::Length;
            }
            State::Length => {
                let len = byte as usize;
                if len > self.max_payload {
                    self.length_errors = self.length_errors.wrapping_add(1);
                    self.state = State::PreambleA;
                    return None;
                }

                self.len = len;
                self.filled = 0;
                self.crc.update(byte);
                self.state = if len == 0 {
                    State::Checksum
                } else {
                    State::Payload
                };
            }
            State::Payload => {
                self.buf[self.filled] = byte;
                self.filled += 1;
                self.crc.update(byte);
                if self.filled == self.len {
                    self.state = State::Checksum;
                }
            }
            State::Checksum => {
                self.state = State::PreambleA;
                if byte == self.crc.value() {
                    self.frames_decoded = self.frames_decoded.wrapping_add(1);
                    return Some(Frame {
                        packet_id: self.packet_id,
                        payload: &self.buf[..self.len],
                    });
                }
                self.crc_errors = self.crc_errors.wrapping_add(1);
            }
        }

        None
    }

    /// Drop any partially received capsule
    pub fn reset(&mut self) {
        self.state = State::PreambleA;
        self.filled = 0;
    }

    /// True while no capsule is in progress
    pub fn is_idle(&self) -> bool {
        self.state == State::PreambleA
    }

    pub fn frames_decoded(&self) -> u32 {
        self.frames_decoded
    }

    pub fn crc_errors(&self) -> u32 {
        self.crc_errors
    }

    /// Capsules dropped because their length byte exceeded the maximum
    pub fn length_errors(&self) -> u32 {
        self.length_errors
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}
