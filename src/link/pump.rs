//! # Duplex Packet Pump
//!
//! Moves one outbound packet and any inbound packets per control-loop tick
//! without ever blocking:
//!
//! - [`DuplexPump::transmit`] frames the outbound packet only if the whole
//!   capsule fits in the transmit FIFO, otherwise defers to the next tick.
//! - [`DuplexPump::receive`] waits until at least one inbound capsule's worth
//!   of bytes is buffered, drains them through the frame decoder, keeps the
//!   last well-sized packet and merges it into the dictionary.
//!
//! The byte-count readiness check is a heuristic. It does not look at what
//! the bytes are, so with several packet types multiplexed on one line a
//! drain may start mid-capsule; the decoder keeps its state across calls and
//! simply finishes the capsule on a later tick.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::packet::{WirePacket, MAX_PACKET_SIZE, PROP_BOARD_ID};
use super::role::LinkRole;
use crate::capsule::{CapsuleCodec, FrameCodec};
use crate::dictionary::ObjectDictionary;
use crate::serial::SerialChannel;

/// Counters for link health monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Capsules written to the channel
    pub frames_sent: u64,
    /// Ticks where the transmit FIFO had no room for a full capsule
    pub tx_deferred: u64,
    /// Inbound packets accepted into the receive buffer
    pub frames_received: u64,
    /// Valid capsules dropped for a foreign id or wrong payload length
    pub frames_discarded: u64,
    /// Times the receive buffer was merged into the dictionary
    pub merges: u64,
    /// Capsules dropped by the frame codec's error detection
    pub crc_errors: u32,
    /// Capsules abandoned for an out-of-range length byte
    pub length_errors: u32,
    /// When a freshly received packet was last merged into the dictionary
    #[serde(skip)]
    pub last_merge: Option<Instant>,
}

/// Periodic, non-blocking packet exchange for one end of the link
pub struct DuplexPump<R: LinkRole, C: FrameCodec = CapsuleCodec> {
    codec: C,
    packet_id: u8,
    /// Reused for every transmit
    outbound: R::Outbound,
    /// Last accepted inbound packet, overwritten wholesale
    inbound: R::Inbound,
    /// Encoded capsule scratch, sized once at construction
    tx_frame: Vec<u8>,
    stats: LinkStats,
}

impl<R: LinkRole, C: FrameCodec> std::fmt::Debug for DuplexPump<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexPump")
            .field("role", &R::NAME)
            .field("packet_id", &self.packet_id)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<R: LinkRole> Default for DuplexPump<R, CapsuleCodec> {
    /// Capsule transport that rejects lengths above [`MAX_PACKET_SIZE`]
    fn default() -> Self {
        Self::new(CapsuleCodec::with_max_payload(MAX_PACKET_SIZE))
    }
}

impl<R: LinkRole, C: FrameCodec> DuplexPump<R, C> {
    /// Build a pump over the given frame codec using [`PROP_BOARD_ID`]
    pub fn new(codec: C) -> Self {
        Self::with_packet_id(codec, PROP_BOARD_ID)
    }

    /// Build a pump that tags and accepts capsules with `packet_id`
    pub fn with_packet_id(codec: C, packet_id: u8) -> Self {
        debug_assert!(R::Outbound::SIZE <= MAX_PACKET_SIZE);
        debug_assert!(R::Inbound::SIZE <= MAX_PACKET_SIZE);

        let frame_len = codec.encoded_len(R::Outbound::SIZE);
        Self {
            codec,
            packet_id,
            outbound: R::Outbound::default(),
            inbound: R::Inbound::default(),
            tx_frame: vec![0u8; frame_len],
            stats: LinkStats::default(),
        }
    }

    /// Encoded size of one outbound capsule
    pub fn outbound_frame_len(&self) -> usize {
        self.codec.encoded_len(R::Outbound::SIZE)
    }

    /// Encoded size of one inbound capsule
    pub fn inbound_frame_len(&self) -> usize {
        self.codec.encoded_len(R::Inbound::SIZE)
    }

    /// Send the outbound packet built from `dict`
    ///
    /// # Returns
    ///
    /// * `bool` - `true` if a full capsule was queued, `false` if the
    ///   transmit FIFO lacked room and nothing was written
    pub fn transmit<S: SerialChannel + ?Sized>(
        &mut self,
        channel: &mut S,
        dict: &ObjectDictionary,
    ) -> bool {
        let frame_len = self.outbound_frame_len();
        if channel.available_for_write() < frame_len {
            self.stats.tx_deferred += 1;
            trace!("{}: TX deferred, need {} bytes", R::NAME, frame_len);
            return false;
        }

        R::load(dict, &mut self.outbound);

        let mut payload = [0u8; MAX_PACKET_SIZE];
        self.outbound.write_bytes(&mut payload);

        match self
            .codec
            .encode(self.packet_id, &payload[..R::Outbound::SIZE], &mut self.tx_frame)
        {
            Ok(written) => {
                channel.write(&self.tx_frame[..written]);
                self.stats.frames_sent += 1;
                true
            }
            Err(e) => {
                warn!("{}: failed to frame outbound packet: {}", R::NAME, e);
                false
            }
        }
    }

    /// Drain received bytes and merge the latest inbound packet into `dict`
    ///
    /// Returns immediately, reading nothing, while fewer bytes than one
    /// inbound capsule are buffered. The dictionary is only written once at
    /// least one inbound packet has ever been accepted.
    pub fn receive<S: SerialChannel + ?Sized>(
        &mut self,
        channel: &mut S,
        dict: &mut ObjectDictionary,
    ) {
        if channel.available() < self.inbound_frame_len() {
            return;
        }

        let Self {
            codec,
            packet_id,
            inbound,
            stats,
            ..
        } = self;

        let mut fresh = false;
        let pending = channel.available();
        for _ in 0..pending {
            let Some(byte) = channel.read() else {
                break;
            };

            let Some(frame) = codec.decode(byte) else {
                continue;
            };

            if frame.packet_id != *packet_id {
                stats.frames_discarded += 1;
                trace!("{}: ignoring capsule with id {}", R::NAME, frame.packet_id);
            } else if frame.len() != R::Inbound::SIZE {
                stats.frames_discarded += 1;
                debug!(
                    "{}: discarding payload of {} bytes, expected {}",
                    R::NAME,
                    frame.len(),
                    R::Inbound::SIZE
                );
            } else {
                *inbound = R::Inbound::read_bytes(frame.payload);
                stats.frames_received += 1;
                fresh = true;
            }
        }

        if self.stats.frames_received > 0 {
            R::merge(&self.inbound, dict);
            self.stats.merges += 1;
            if fresh {
                self.stats.last_merge = Some(Instant::now());
            }
        }
    }

    /// Last packet built by [`DuplexPump::transmit`]
    pub fn outbound(&self) -> &R::Outbound {
        &self.outbound
    }

    /// Last packet accepted by [`DuplexPump::receive`]
    pub fn inbound(&self) -> &R::Inbound {
        &self.inbound
    }

    /// Snapshot of the link counters
    pub fn stats(&self) -> LinkStats {
        LinkStats {
            crc_errors: self.codec.crc_errors(),
            length_errors: self.codec.length_errors(),
            ..self.stats
        }
    }

    /// True if no fresh packet was merged within `timeout` of `now`
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        match self.stats.last_merge {
            Some(at) => now.saturating_duration_since(at) > timeout,
            None => true,
        }
    }
}
