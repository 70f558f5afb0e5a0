//! Byte-level transports underneath the command/response primitive.
//!
//! A [`Transport`] moves raw bytes to and from one instrument. The
//! [`SerialTransport`] talks to real hardware through the `serialport` crate;
//! the [`MockTransport`] replays scripted replies so driver logic can be
//! exercised without a device attached.

pub mod mock_adapter;
pub mod serial_adapter;

pub use mock_adapter::{MockHandle, MockTransport};
pub use serial_adapter::SerialTransport;

use std::io;

/// Blocking byte transport owned exclusively by one device driver.
///
/// Implementations are not expected to be shared between threads; the
/// driver holding the transport serialises every exchange.
pub trait Transport: Send {
    /// Write the whole buffer.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Push any buffered output onto the line.
    fn flush(&mut self) -> io::Result<()>;

    /// Read whatever is available into `buf`.
    ///
    /// When nothing arrives within the transport's per-read timeout this
    /// returns an error of kind [`io::ErrorKind::TimedOut`].
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard pending input and output.
    fn clear_buffers(&mut self) -> io::Result<()>;

    /// Release the underlying handle. Called at most once per transport.
    fn close(&mut self) -> io::Result<()>;
}
