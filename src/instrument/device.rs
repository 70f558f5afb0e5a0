//! Synchronous command/response driver for one serial instrument.
//!
//! # Example Usage
//!
//! ```no_run
//! use lab_serial::devices::aladdin;
//! use lab_serial::instrument::{CommandArgs, SerialCommandDevice};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut pump = SerialCommandDevice::connect(aladdin::profile("/dev/ttyUSB0", 9600))?;
//!
//!     let firmware = pump.query("VER", &CommandArgs::new())?;
//!     println!("Firmware: {}", firmware);
//!
//!     pump.close();
//!     Ok(())
//! }
//! ```

use crate::adapters::{SerialTransport, Transport};
use crate::config::ConnectionConfig;
use crate::error::{DeviceError, DeviceResult};
use crate::instrument::command_table::{CommandArgs, CommandTable, ReplyMode};
use crate::instrument::poll::{Clock, PollSettings, SystemClock};
use crate::instrument::reply::{ReplyFraming, StatusReply};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest reply line accepted before the terminator must have arrived
const MAX_REPLY_BYTES: usize = 4096;

/// Everything that distinguishes one instrument family from another
#[derive(Clone, Debug)]
pub struct DeviceProfile {
    /// Short label used in log messages
    pub label: String,
    /// Port settings
    pub connection: ConnectionConfig,
    /// Appended to every command (e.g. "\r" or "\r\n")
    pub command_terminator: String,
    /// How reply lines end and which framing is stripped
    pub framing: ReplyFraming,
    /// Command vocabulary
    pub table: CommandTable,
    /// Pause after a command the instrument does not answer
    pub silent_settle: Duration,
}

/// Driver owning one serial connection
///
/// Methods take `&mut self`: one command is in flight at a time and sharing a
/// device between threads requires the caller's own synchronisation. The
/// connection is released by [`close`](Self::close) or when the driver drops.
pub struct SerialCommandDevice {
    profile: DeviceProfile,
    transport: Option<Box<dyn Transport>>,
    clock: Box<dyn Clock>,
}

impl SerialCommandDevice {
    /// Create a driver that is not yet connected.
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            transport: None,
            clock: Box::new(SystemClock),
        }
    }

    /// Use a different time source for settle pauses and polling.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Create a driver and open its serial port.
    ///
    /// # Errors
    /// Returns [`DeviceError::Connection`] if the port cannot be opened.
    pub fn connect(profile: DeviceProfile) -> DeviceResult<Self> {
        let mut device = Self::new(profile);
        device.open()?;
        Ok(device)
    }

    /// Open the serial port described by the profile.
    ///
    /// On failure the driver stays disconnected: later operations fail with
    /// [`DeviceError::NotConnected`] without touching any hardware.
    pub fn open(&mut self) -> DeviceResult<()> {
        if self.transport.is_some() {
            return Ok(());
        }
        let config = &self.profile.connection;
        match SerialTransport::open(config) {
            Ok(transport) => self.attach(transport),
            Err(source) => {
                error!(
                    "[{}] Cannot open {} @ {} baud ({}): {}",
                    self.profile.label,
                    config.path,
                    config.baud_rate,
                    config.framing(),
                    source
                );
                Err(DeviceError::Connection {
                    path: config.path.clone(),
                    source,
                })
            }
        }
    }

    /// Take ownership of an already open transport.
    ///
    /// Waits the settle delay, then flushes both buffers. Any previously
    /// attached transport is closed first.
    pub fn attach(&mut self, transport: impl Transport + 'static) -> DeviceResult<()> {
        self.close();
        let mut transport: Box<dyn Transport> = Box::new(transport);
        self.clock.sleep(self.profile.connection.settle_delay);
        transport.clear_buffers()?;
        self.transport = Some(transport);
        let config = &self.profile.connection;
        info!(
            "[{}] Opened {} @ {} baud ({}, no flow control)",
            self.profile.label,
            config.path,
            config.baud_rate,
            config.framing()
        );
        Ok(())
    }

    /// True while a transport is attached.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Profile the driver was built with.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// The device's command vocabulary.
    pub fn table(&self) -> &CommandTable {
        &self.profile.table
    }

    /// Block for `duration` on the driver's clock (timed runs between commands).
    pub fn pause(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    fn transport(&mut self) -> DeviceResult<&mut Box<dyn Transport>> {
        self.transport.as_mut().ok_or(DeviceError::NotConnected)
    }

    /// Look up `name`, substitute `args`, append the terminator and write it.
    ///
    /// Nothing is written when the command is unknown or cannot be formatted.
    pub fn send_command(&mut self, name: &str, args: &CommandArgs) -> DeviceResult<()> {
        if !self.is_connected() {
            return Err(DeviceError::NotConnected);
        }
        let command = self.profile.table.render(name, args)?;
        self.send_raw(&command)
    }

    /// Write a literal command line that is not in the table.
    pub fn send_raw(&mut self, command: &str) -> DeviceResult<()> {
        let wire = format!("{}{}", command, self.profile.command_terminator);
        let label = self.profile.label.clone();
        let transport = self.transport()?;
        transport.write_all(wire.as_bytes())?;
        transport.flush()?;
        debug!("[{}] Sent command: {}", label, command);
        Ok(())
    }

    /// Read one reply line, up to the profile's terminator byte.
    ///
    /// Bytes already waiting in the transport are always consumed; the
    /// deadline is checked only while the line is idle.
    ///
    /// # Errors
    /// [`DeviceError::Timeout`] if the terminator does not arrive within
    /// `timeout`; the connection stays usable and the caller may retry.
    pub fn read_response(&mut self, timeout: Duration) -> DeviceResult<String> {
        let label = self.profile.label.clone();
        let framing = self.profile.framing;
        let transport = self.transport()?;

        let start = Instant::now();
        let mut response: Vec<u8> = Vec::new();
        let mut buffer = [0u8; 1];

        loop {
            match transport.read(&mut buffer) {
                Ok(0) => {
                    return Err(DeviceError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "unexpected EOF from serial port",
                    )));
                }
                Ok(_) => {
                    response.push(buffer[0]);
                    if buffer[0] == framing.terminator {
                        break;
                    }
                    if response.len() >= MAX_REPLY_BYTES {
                        return Err(DeviceError::Io(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("no reply terminator within {} bytes", MAX_REPLY_BYTES),
                        )));
                    }
                    // Buffered bytes are drained before the deadline applies
                    continue;
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(DeviceError::Io(e)),
            }

            if start.elapsed() >= timeout {
                if response.is_empty() {
                    debug!("[{}] No reply within {:?}", label, timeout);
                } else {
                    warn!(
                        "[{}] Partial reply dropped after {:?}: {:?}",
                        label,
                        timeout,
                        String::from_utf8_lossy(&response)
                    );
                }
                return Err(DeviceError::Timeout(timeout));
            }
        }

        let text = framing.strip(&String::from_utf8_lossy(&response));
        debug!("[{}] Received response: {}", label, text);
        Ok(text)
    }

    /// Send a table command and parse its reply.
    ///
    /// Commands the instrument does not answer return an empty reply after
    /// the profile's settle pause.
    pub fn query(&mut self, name: &str, args: &CommandArgs) -> DeviceResult<StatusReply> {
        self.send_command(name, args)?;
        let silent = self
            .profile
            .table
            .get(name)
            .is_some_and(|spec| spec.reply == ReplyMode::Silent);
        if silent {
            self.clock.sleep(self.profile.silent_settle);
            return Ok(StatusReply::parse(""));
        }
        let line = self.read_response(self.profile.connection.reply_timeout)?;
        Ok(StatusReply::parse(&line))
    }

    /// Send a command without reading a reply, then wait the settle pause.
    pub fn execute(&mut self, name: &str, args: &CommandArgs) -> DeviceResult<()> {
        self.send_command(name, args)?;
        self.clock.sleep(self.profile.silent_settle);
        Ok(())
    }

    /// Send a literal command line and parse its reply.
    pub fn query_raw(&mut self, command: &str) -> DeviceResult<StatusReply> {
        self.send_raw(command)?;
        let line = self.read_response(self.profile.connection.reply_timeout)?;
        Ok(StatusReply::parse(&line))
    }

    /// Repeat `status_query` until `predicate` accepts a reply.
    ///
    /// The first attempt is immediate; later ones follow `settings.interval`
    /// apart. Once `settings.max_wait` has elapsed no further attempt starts,
    /// so at most [`PollSettings::max_attempts`] queries are sent. A read timeout
    /// counts as an unsatisfied attempt because instruments may stay silent
    /// while busy; other errors end the poll.
    ///
    /// # Errors
    /// [`DeviceError::PollTimeout`] when the predicate never held,
    /// [`DeviceError::InvalidArgument`] for a zero interval.
    pub fn poll_until<P>(
        &mut self,
        status_query: &str,
        args: &CommandArgs,
        mut predicate: P,
        settings: PollSettings,
    ) -> DeviceResult<StatusReply>
    where
        P: FnMut(&StatusReply) -> bool,
    {
        if settings.interval.is_zero() {
            return Err(DeviceError::InvalidArgument(
                "poll interval must be positive".to_string(),
            ));
        }
        let start = self.clock.now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.query(status_query, args) {
                Ok(reply) => {
                    if predicate(&reply) {
                        debug!(
                            "[{}] Poll '{}' satisfied after {} attempts: {}",
                            self.profile.label, status_query, attempts, reply
                        );
                        return Ok(reply);
                    }
                    debug!(
                        "[{}] Poll '{}' attempt {}: {}",
                        self.profile.label, status_query, attempts, reply
                    );
                }
                Err(DeviceError::Timeout(_)) => {
                    debug!(
                        "[{}] Poll '{}' attempt {}: no reply",
                        self.profile.label, status_query, attempts
                    );
                }
                Err(e) => return Err(e),
            }

            self.clock.sleep(settings.interval);
            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= settings.max_wait {
                warn!(
                    "[{}] Poll '{}' timed out after {} attempts ({:?})",
                    self.profile.label, status_query, attempts, elapsed
                );
                return Err(DeviceError::PollTimeout { attempts, elapsed });
            }
        }
    }

    /// Release the connection. Calling this again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                warn!("[{}] Error while closing port: {}", self.profile.label, e);
            }
            info!(
                "[{}] Serial port {} closed",
                self.profile.label, self.profile.connection.path
            );
        }
    }
}

impl Drop for SerialCommandDevice {
    fn drop(&mut self) {
        self.close();
    }
}
