//! RS-232 transport backed by the `serialport` crate.

use crate::adapters::Transport;
use crate::config::{ConnectionConfig, SerialFlowControl, SerialParity};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use tracing::debug;

/// Serial transport for RS-232 communication
///
/// Wraps a blocking [`SerialPort`] opened with the framing parameters from a
/// [`ConnectionConfig`]. The port's own timeout is the per-read timeout; the
/// overall reply deadline is enforced by the device driver above.
pub struct SerialTransport {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open the port described by `config`.
    ///
    /// # Errors
    /// Returns the `serialport` error when the device node is missing, access
    /// is denied, or the framing parameters are not supported.
    pub fn open(config: &ConnectionConfig) -> serialport::Result<Self> {
        let port = serialport::new(&config.path, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits)?)
            .flow_control(flow_control(config.flow_control))
            .timeout(config.read_timeout)
            .open()?;

        debug!(
            "Serial port '{}' opened at {} baud ({}{}{})",
            config.path,
            config.baud_rate,
            config.data_bits,
            config.parity.code(),
            config.stop_bits
        );

        Ok(Self {
            port_name: config.path.clone(),
            port,
        })
    }

    /// Path of the underlying device node.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::All).map_err(io::Error::from)
    }

    fn close(&mut self) -> io::Result<()> {
        // The OS handle is released when `port` drops; flush what is pending first.
        let result = self.port.flush();
        debug!("Serial port '{}' closed", self.port_name);
        result
    }
}

fn data_bits(bits: u8) -> serialport::Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(serialport::Error::new(
            serialport::ErrorKind::InvalidInput,
            format!("unsupported data bits: {}", other),
        )),
    }
}

fn stop_bits(bits: u8) -> serialport::Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(serialport::Error::new(
            serialport::ErrorKind::InvalidInput,
            format!("unsupported stop bits: {}", other),
        )),
    }
}

fn parity(parity: SerialParity) -> Parity {
    match parity {
        SerialParity::None => Parity::None,
        SerialParity::Even => Parity::Even,
        SerialParity::Odd => Parity::Odd,
    }
}

fn flow_control(flow: SerialFlowControl) -> FlowControl {
    match flow {
        SerialFlowControl::None => FlowControl::None,
        SerialFlowControl::Software => FlowControl::Software,
        SerialFlowControl::Hardware => FlowControl::Hardware,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_conversion() {
        assert_eq!(data_bits(7).unwrap(), DataBits::Seven);
        assert_eq!(data_bits(8).unwrap(), DataBits::Eight);
        assert_eq!(stop_bits(2).unwrap(), StopBits::Two);
        assert_eq!(parity(SerialParity::Even), Parity::Even);
        assert_eq!(flow_control(SerialFlowControl::None), FlowControl::None);
    }

    #[test]
    fn test_rejects_unsupported_framing() {
        assert!(data_bits(9).is_err());
        assert!(stop_bits(3).is_err());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = ConnectionConfig::new("/dev/lab-serial-does-not-exist", 9600);
        assert!(SerialTransport::open(&config).is_err());
    }
}
