//! # Serial Communication Module
//!
//! Connects the synchronous packet pump to the propulsion board UART.
//!
//! This module handles:
//! - Opening the serial device (8N1, no flow control)
//! - A reader task that forwards received chunks over an mpsc queue
//! - A writer task fed through a bounded mpsc queue, so a slow line never
//!   stalls the control loop
//! - Moving bytes between those queues and the [`BufferedChannel`] FIFOs
//!   once per tick

pub mod channel;
pub mod port_trait;

pub use channel::{BufferedChannel, InFlight, SerialChannel};
pub use port_trait::{SerialPortIO, TokioSerialPort};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};

use crate::error::{PropLinkError, Result};

/// Default link baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Device paths tried after the configured one (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyAMA0", // on-board UART
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Bytes requested per read from the port
const READ_CHUNK_SIZE: usize = 64;

/// Received chunks buffered between the reader task and the loop
const RX_QUEUE_DEPTH: usize = 64;

/// Outgoing chunks buffered between the loop and the writer task
const TX_QUEUE_DEPTH: usize = 8;

/// Queues and task handles connecting the loop to an open port
#[derive(Debug)]
pub struct LinkIo {
    /// Chunks read from the port
    pub rx: mpsc::Receiver<Bytes>,
    /// Chunks for the writer task
    pub tx: mpsc::Sender<Bytes>,
    pub reader: JoinHandle<()>,
    pub writer: JoinHandle<()>,
}

impl LinkIo {
    /// Stop both port tasks
    pub fn abort(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// Configured path first, then the defaults not already listed
fn candidate_paths(configured: &str) -> Vec<&str> {
    let mut paths = vec![configured];
    paths.extend(
        DEFAULT_DEVICE_PATHS
            .iter()
            .copied()
            .filter(|p| *p != configured),
    );
    paths
}

/// Serial connection to the other end of the link
pub struct LinkSerial {
    port: SerialStream,
    device_path: String,
}

impl std::fmt::Debug for LinkSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl LinkSerial {
    /// Open `configured`, falling back to the default device paths
    pub fn open(configured: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&candidate_paths(configured), baud_rate)
    }

    /// Open the first of `paths` that can be opened
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened link device at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                }
            }
        }

        Err(PropLinkError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| PropLinkError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Spawn the reader and writer tasks for this port
    ///
    /// The writer releases bytes on `in_flight` as the port takes them.
    /// Must be called inside a tokio runtime.
    pub fn spawn(self, in_flight: InFlight) -> LinkIo {
        let (reader, writer): (ReadHalf<SerialStream>, WriteHalf<SerialStream>) =
            tokio::io::split(self.port);

        let (rx_sender, rx) = mpsc::channel(RX_QUEUE_DEPTH);
        let (tx, tx_receiver) = mpsc::channel(TX_QUEUE_DEPTH);

        LinkIo {
            rx,
            tx,
            reader: tokio::spawn(read_loop(reader, rx_sender)),
            writer: tokio::spawn(write_loop(
                TokioSerialPort::new(writer),
                tx_receiver,
                in_flight,
            )),
        }
    }
}

/// Forward everything read from `reader` to `tx` until EOF, error or the
/// receiving side goes away
pub async fn read_loop<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::Sender<Bytes>) {
    let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);

    loop {
        buf.reserve(READ_CHUNK_SIZE);
        match reader.read_buf(&mut buf).await {
            Ok(0) => {
                warn!("Serial port closed");
                break;
            }
            Ok(n) => {
                debug!("Read {} bytes from port", n);
                if tx.send(buf.split().freeze()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Serial read failed: {}", e);
                break;
            }
        }
    }
}

/// Move every chunk already received into the channel's receive FIFO
///
/// Never waits: chunks that have not arrived yet are picked up next tick.
pub fn drain_into(rx: &mut mpsc::Receiver<Bytes>, channel: &mut BufferedChannel) -> usize {
    let mut moved = 0;
    while let Ok(chunk) = rx.try_recv() {
        moved += channel.push_rx(&chunk);
    }
    moved
}

/// Write every chunk from `rx` to `port` until the sending side goes away
///
/// Each chunk is released on `in_flight` after its write completes or fails.
pub async fn write_loop<P: SerialPortIO>(
    mut port: P,
    mut rx: mpsc::Receiver<Bytes>,
    in_flight: InFlight,
) {
    while let Some(chunk) = rx.recv().await {
        let result = match port.write_all(&chunk).await {
            Ok(()) => port.flush().await,
            Err(e) => Err(e),
        };
        in_flight.release(chunk.len());

        match result {
            Ok(()) => debug!("Sent {} bytes", chunk.len()),
            Err(e) => warn!("Serial write failed: {}", e),
        }
    }
}

/// Hand whatever the pump queued this tick to the writer task
///
/// Never waits. If the writer queue is full the bytes stay in the FIFO and
/// keep counting against `available_for_write`.
///
/// # Returns
///
/// * `Result<usize>` - Bytes handed to the writer
///
/// # Errors
///
/// Returns `Serial` if the writer task has stopped
pub fn flush_channel(tx: &mpsc::Sender<Bytes>, channel: &mut BufferedChannel) -> Result<usize> {
    if channel.pending_tx() == 0 {
        return Ok(0);
    }

    let permit = match tx.try_reserve() {
        Ok(permit) => permit,
        Err(TrySendError::Full(())) => {
            trace!("Writer queue full, holding {} bytes", channel.pending_tx());
            return Ok(0);
        }
        Err(TrySendError::Closed(())) => {
            return Err(PropLinkError::Serial("Serial writer task stopped".to_string()));
        }
    };

    let out = channel.hand_off_tx();
    let n = out.len();
    permit.send(out);
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::{GatedSerialPort, MockSerialPort};
    use super::*;
    use crate::dictionary::ObjectDictionary;
    use crate::link::{AvionicsRole, DuplexPump};

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BAUD_RATE, 115_200);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyAMA0");
    }

    #[test]
    fn test_candidate_paths_put_configured_port_first() {
        assert_eq!(
            candidate_paths("/dev/ttyS3"),
            vec!["/dev/ttyS3", "/dev/ttyAMA0", "/dev/ttyUSB0"]
        );
    }

    #[test]
    fn test_candidate_paths_skip_duplicate_default() {
        assert_eq!(candidate_paths("/dev/ttyUSB0"), vec!["/dev/ttyUSB0", "/dev/ttyAMA0"]);
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let err = LinkSerial::open_with_paths(invalid_paths, DEFAULT_BAUD_RATE).unwrap_err();

        match err {
            PropLinkError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            _ => panic!("Expected SerialPortNotFound error, got: {:?}", err),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        match LinkSerial::open_with_paths(empty_paths, DEFAULT_BAUD_RATE) {
            Err(PropLinkError::SerialPortNotFound(_)) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let err = LinkSerial::open_port("/dev/nonexistent_serial_device_12345", DEFAULT_BAUD_RATE)
            .unwrap_err();

        match err {
            PropLinkError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            _ => panic!("Expected Serial error, got: {:?}", err),
        }
    }

    #[tokio::test]
    async fn test_flushed_bytes_reach_the_port() {
        let port = MockSerialPort::new();
        let mut channel = BufferedChannel::default();
        let (tx, rx) = mpsc::channel(TX_QUEUE_DEPTH);
        let writer = tokio::spawn(write_loop(port.clone(), rx, channel.in_flight()));

        channel.write(&[1, 2, 3, 4]);
        assert_eq!(flush_channel(&tx, &mut channel).unwrap(), 4);
        assert_eq!(channel.pending_tx(), 0);

        drop(tx);
        writer.await.unwrap();
        assert_eq!(port.get_written_data(), vec![vec![1, 2, 3, 4]]);
        assert_eq!(channel.in_flight().get(), 0);
    }

    #[test]
    fn test_flush_channel_skips_empty_fifo() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut channel = BufferedChannel::default();

        assert_eq!(flush_channel(&tx, &mut channel).unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_flush_channel_holds_bytes_when_writer_queue_full() {
        let (tx, _rx) = mpsc::channel(1);
        let mut channel = BufferedChannel::new(16, 16);

        channel.write(&[1, 2]);
        assert_eq!(flush_channel(&tx, &mut channel).unwrap(), 2);
        channel.write(&[3, 4, 5]);
        assert_eq!(flush_channel(&tx, &mut channel).unwrap(), 0);

        assert_eq!(channel.pending_tx(), 3);
        assert_eq!(channel.available_for_write(), 16 - 2 - 3);
    }

    #[test]
    fn test_flush_channel_reports_stopped_writer() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut channel = BufferedChannel::default();
        channel.write(&[9]);

        match flush_channel(&tx, &mut channel) {
            Err(PropLinkError::Serial(msg)) => assert!(msg.contains("writer task stopped")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_error_still_releases_capacity() {
        let port = MockSerialPort::new();
        port.set_write_error(std::io::ErrorKind::BrokenPipe);
        let mut channel = BufferedChannel::new(8, 8);
        let (tx, rx) = mpsc::channel(1);
        let writer = tokio::spawn(write_loop(port, rx, channel.in_flight()));

        channel.write(&[9, 9, 9]);
        flush_channel(&tx, &mut channel).unwrap();

        drop(tx);
        writer.await.unwrap();
        assert_eq!(channel.available_for_write(), 8);
    }

    #[tokio::test]
    async fn test_slow_port_defers_transmit_instead_of_blocking() {
        let port = GatedSerialPort::new();
        let mut channel = BufferedChannel::new(64, 64);
        let (tx, rx) = mpsc::channel(TX_QUEUE_DEPTH);
        let writer = tokio::spawn(write_loop(port.clone(), rx, channel.in_flight()));

        let mut pump = DuplexPump::<AvionicsRole>::default();
        let dict = ObjectDictionary::new();
        let frame_len = pump.outbound_frame_len();

        // The port has not written a byte yet, so each tick eats into the
        // transmit capacity until a full capsule no longer fits
        let fits = 64 / frame_len;
        for _ in 0..fits {
            assert!(pump.transmit(&mut channel, &dict));
            assert_eq!(flush_channel(&tx, &mut channel).unwrap(), frame_len);
        }
        assert!(!pump.transmit(&mut channel, &dict));
        assert_eq!(pump.stats().tx_deferred, 1);
        assert_eq!(channel.available_for_write(), 64 - fits * frame_len);

        port.open_gate(fits);
        drop(tx);
        writer.await.unwrap();

        assert_eq!(port.writes(), fits);
        assert_eq!(channel.available_for_write(), 64);
        assert!(pump.transmit(&mut channel, &dict));
    }

    #[tokio::test]
    async fn test_read_loop_forwards_chunks_until_eof() {
        let reader = tokio_test::io::Builder::new()
            .read(&[0xFF, 0xFA])
            .read(&[46, 0])
            .build();
        let (tx, mut rx) = mpsc::channel(4);

        read_loop(reader, tx).await;

        let mut channel = BufferedChannel::default();
        assert_eq!(drain_into(&mut rx, &mut channel), 4);
        let bytes: Vec<u8> = std::iter::from_fn(|| channel.read()).collect();
        assert_eq!(bytes, vec![0xFF, 0xFA, 46, 0]);
    }

    #[test]
    fn test_drain_into_empty_queue() {
        let (_tx, mut rx) = mpsc::channel::<Bytes>(1);
        let mut channel = BufferedChannel::default();
        assert_eq!(drain_into(&mut rx, &mut channel), 0);
    }

    // Only runs with the propulsion board attached
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_open_with_real_hardware() {
        match LinkSerial::open(DEFAULT_DEVICE_PATHS[0], DEFAULT_BAUD_RATE) {
            Ok(serial) => println!("Opened link device at: {}", serial.device_path()),
            Err(_) => println!("No link hardware detected (this is OK for CI/CD)"),
        }
    }
}
