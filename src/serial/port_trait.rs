//! Trait abstraction over the port's write side so the writer task can be
//! tested without hardware

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Write half of a serial port
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Adapter from any tokio writer (e.g. the write half of a
/// `tokio_serial::SerialStream`) to [`SerialPortIO`]
pub struct TokioSerialPort<W> {
    writer: W,
}

impl<W> TokioSerialPort<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SerialPortIO for TokioSerialPort<W> {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_adapter_writes_through() {
        let writer = tokio_test::io::Builder::new().write(&[0xFF, 0xFA, 46]).build();
        let mut port = TokioSerialPort::new(writer);
        port.write_all(&[0xFF, 0xFA, 46]).await.unwrap();
        port.flush().await.unwrap();
    }
}
