//! Non-blocking byte channel the packet pump talks to.
//!
//! [`BufferedChannel`] models a UART driver's software FIFOs: the pump reads
//! and writes it synchronously, and the async port glue moves bytes between
//! it and the real device between ticks.
//!
//! Bytes handed to the writer task stay charged against the transmit
//! capacity until the port has actually taken them, so a slow line shows up
//! as a short `available_for_write` rather than a stalled loop.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Default transmit FIFO size in bytes
pub const DEFAULT_TX_CAPACITY: usize = 64;

/// Default receive FIFO size in bytes
pub const DEFAULT_RX_CAPACITY: usize = 256;

/// Byte-oriented duplex stream. No method may block.
#[cfg_attr(test, mockall::automock)]
pub trait SerialChannel {
    /// Bytes that can be written right now without blocking
    fn available_for_write(&self) -> usize;

    /// Queue bytes for transmission
    fn write(&mut self, bytes: &[u8]);

    /// Bytes waiting to be read
    fn available(&self) -> usize;

    /// Pop one received byte
    fn read(&mut self) -> Option<u8>;
}

/// Shared count of transmit bytes handed off but not yet written to the port
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn add(&self, n: usize) {
        self.0.fetch_add(n, Ordering::AcqRel);
    }

    /// Mark `n` bytes as written
    pub fn release(&self, n: usize) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(v.saturating_sub(n))
            });
    }
}

/// In-memory transmit/receive FIFOs with bounded capacity
#[derive(Debug)]
pub struct BufferedChannel {
    rx: VecDeque<u8>,
    rx_capacity: usize,
    tx: BytesMut,
    tx_capacity: usize,
    in_flight: InFlight,
    rx_overflows: u64,
}

impl Default for BufferedChannel {
    fn default() -> Self {
        Self::new(DEFAULT_TX_CAPACITY, DEFAULT_RX_CAPACITY)
    }
}

impl BufferedChannel {
    pub fn new(tx_capacity: usize, rx_capacity: usize) -> Self {
        Self {
            rx: VecDeque::with_capacity(rx_capacity),
            rx_capacity,
            tx: BytesMut::with_capacity(tx_capacity),
            tx_capacity,
            in_flight: InFlight::new(),
            rx_overflows: 0,
        }
    }

    /// Append received bytes, dropping whatever does not fit
    ///
    /// # Returns
    ///
    /// * `usize` - Number of bytes accepted
    pub fn push_rx(&mut self, bytes: &[u8]) -> usize {
        let room = self.rx_capacity.saturating_sub(self.rx.len());
        let accepted = bytes.len().min(room);
        self.rx.extend(&bytes[..accepted]);

        if accepted < bytes.len() {
            self.rx_overflows += (bytes.len() - accepted) as u64;
            warn!("RX FIFO full, dropped {} bytes", bytes.len() - accepted);
        }

        accepted
    }

    /// Take everything queued for transmission, leaving the FIFO empty
    pub fn take_tx(&mut self) -> Bytes {
        self.tx.split().freeze()
    }

    /// Take everything queued for transmission and keep charging it against
    /// the transmit capacity until the writer calls [`InFlight::release`]
    pub fn hand_off_tx(&mut self) -> Bytes {
        let out = self.take_tx();
        self.in_flight.add(out.len());
        out
    }

    /// Handle the writer task uses to release handed-off bytes
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    /// Move queued transmit bytes into another channel's receive FIFO
    pub fn deliver_to(&mut self, other: &mut BufferedChannel) -> usize {
        let out = self.take_tx();
        other.push_rx(&out)
    }

    pub fn pending_tx(&self) -> usize {
        self.tx.len()
    }

    /// Bytes dropped because the receive FIFO was full
    pub fn rx_overflows(&self) -> u64 {
        self.rx_overflows
    }
}

impl SerialChannel for BufferedChannel {
    fn available_for_write(&self) -> usize {
        self.tx_capacity.saturating_sub(self.tx.len() + self.in_flight.get())
    }

    fn write(&mut self, bytes: &[u8]) {
        self.tx.put_slice(bytes);
    }

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_reduces_available_for_write() {
        let mut channel = BufferedChannel::new(8, 8);
        assert_eq!(channel.available_for_write(), 8);
        channel.write(&[1, 2, 3]);
        assert_eq!(channel.available_for_write(), 5);
        assert_eq!(channel.pending_tx(), 3);
    }

    #[test]
    fn test_take_tx_empties_fifo() {
        let mut channel = BufferedChannel::new(8, 8);
        channel.write(&[1, 2, 3]);
        let out = channel.take_tx();
        assert_eq!(&out[..], &[1, 2, 3]);
        assert_eq!(channel.pending_tx(), 0);
        assert_eq!(channel.available_for_write(), 8);
    }

    #[test]
    fn test_handed_off_bytes_hold_capacity_until_released() {
        let mut channel = BufferedChannel::new(8, 8);
        channel.write(&[1, 2, 3]);

        let out = channel.hand_off_tx();
        assert_eq!(&out[..], &[1, 2, 3]);
        assert_eq!(channel.pending_tx(), 0);
        assert_eq!(channel.available_for_write(), 5);

        channel.in_flight().release(out.len());
        assert_eq!(channel.available_for_write(), 8);
    }

    #[test]
    fn test_release_saturates_at_zero() {
        let in_flight = InFlight::new();
        in_flight.release(4);
        assert_eq!(in_flight.get(), 0);
    }

    #[test]
    fn test_read_is_fifo() {
        let mut channel = BufferedChannel::default();
        channel.push_rx(&[10, 20]);
        assert_eq!(channel.available(), 2);
        assert_eq!(channel.read(), Some(10));
        assert_eq!(channel.read(), Some(20));
        assert_eq!(channel.read(), None);
    }

    #[test]
    fn test_rx_overflow_drops_excess() {
        let mut channel = BufferedChannel::new(8, 4);
        assert_eq!(channel.push_rx(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(channel.available(), 4);
        assert_eq!(channel.rx_overflows(), 2);
    }

    #[test]
    fn test_deliver_to_moves_bytes() {
        let mut a = BufferedChannel::default();
        let mut b = BufferedChannel::default();
        a.write(&[7, 8, 9]);
        assert_eq!(a.deliver_to(&mut b), 3);
        assert_eq!(a.pending_tx(), 0);
        assert_eq!(b.available(), 3);
    }
}
