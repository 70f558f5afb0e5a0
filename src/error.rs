//! Error types for serial instrument drivers.
//!
//! `DeviceError` is the single error type returned by the command/response
//! primitive in [`crate::instrument`]. Using `thiserror`, each failure mode a
//! caller may want to react to gets its own variant:
//!
//! - **`Connection`**: the serial port could not be opened (missing device
//!   node, permission denied, device busy).
//! - **`NotConnected`**: an operation was attempted on a driver whose port
//!   was never opened or has already been closed. No I/O was attempted.
//! - **`UnknownCommand`** / **`Template`**: the command name is not in the
//!   device's table, or its arguments could not be substituted. Nothing was
//!   written to the wire.
//! - **`Io`**: a write, flush or read failed at the transport level.
//! - **`Timeout`**: a single reply did not arrive within the read timeout.
//!   The connection stays usable.
//! - **`PollTimeout`**: a status poll never satisfied its predicate before
//!   the maximum wait elapsed.
//!
//! The driver never retries on its own; every failure surfaces to the caller.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Failure of a driver operation.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The port could not be opened
    #[error("Failed to open serial port '{path}': {source}")]
    Connection {
        /// Device path that was opened
        path: String,
        /// Underlying serialport error
        #[source]
        source: serialport::Error,
    },

    /// No open port; nothing was sent
    #[error("Serial port not connected")]
    NotConnected,

    /// Name not present in the command table
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    /// Arguments did not fit the command template
    #[error("Cannot format command '{name}': {reason}")]
    Template {
        /// Command name
        name: String,
        /// Formatter message
        reason: String,
    },

    /// Argument outside the instrument's accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport write, flush or read failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete reply within the read timeout
    #[error("Serial read timeout after {0:?}")]
    Timeout(Duration),

    /// Poll predicate never held within the maximum wait
    #[error("Status poll gave up after {attempts} attempts ({elapsed:?} elapsed)")]
    PollTimeout {
        /// Queries sent
        attempts: u32,
        /// Time since the first query
        elapsed: Duration,
    },

    /// Reply arrived but does not mean what the caller needs
    #[error("Unexpected reply to '{command}': {reply:?}")]
    UnexpectedReply {
        /// Command that was sent
        command: String,
        /// Reply text after framing was stripped
        reply: String,
    },
}

impl DeviceError {
    /// True for errors after which the same connection can keep being used.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DeviceError::Timeout(_)
                | DeviceError::PollTimeout { .. }
                | DeviceError::UnknownCommand(_)
                | DeviceError::Template { .. }
                | DeviceError::InvalidArgument(_)
                | DeviceError::UnexpectedReply { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeviceError::UnknownCommand("FOO".to_string());
        assert_eq!(err.to_string(), "Unknown command 'FOO'");
    }

    #[test]
    fn test_poll_timeout_display() {
        let err = DeviceError::PollTimeout {
            attempts: 11,
            elapsed: Duration::from_secs(10),
        };
        assert!(err.to_string().contains("11 attempts"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_not_connected_is_not_recoverable() {
        assert!(!DeviceError::NotConnected.is_recoverable());
    }
}
