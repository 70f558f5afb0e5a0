//! Connection parameters and settings loading.
//!
//! [`ConnectionConfig`] carries the framing used to open one serial port.
//! [`Settings`] names the instruments of a bench setup and is loaded from:
//! 1. a TOML file (base configuration)
//! 2. environment variables prefixed with `LABSERIAL_` (nested keys separated by `__`)
//!
//! ```toml
//! [[devices]]
//! name = "pump"
//! kind = "syringe_pump"
//! port = "/dev/ttyUSB0"
//!
//! [[devices]]
//! name = "plate"
//! kind = "hot_plate"
//! port = "/dev/ttyUSB2"
//! reply_timeout = "750ms"
//! ```

use crate::devices;
use crate::instrument::DeviceProfile;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment could not be read or deserialised
    #[error("Configuration load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    /// Values parsed but are not usable
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Parity modes for serial communication
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity bit
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl SerialParity {
    /// Single-letter code as used in "8N1"-style framing notation.
    pub fn code(self) -> char {
        match self {
            SerialParity::None => 'N',
            SerialParity::Even => 'E',
            SerialParity::Odd => 'O',
        }
    }
}

/// Flow control modes. The instruments handled here all run without it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialFlowControl {
    /// No flow control
    #[default]
    None,
    /// XON/XOFF
    Software,
    /// RTS/CTS
    Hardware,
}

/// Framing and timing for a serial port connection
///
/// Immutable once the port has been opened with it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Path to the serial device (e.g., "/dev/ttyUSB0", "COM3")
    pub path: String,
    /// Baud rate (9600, 19200, etc.)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Data bits (7 or 8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Parity setting
    #[serde(default = "default_parity")]
    pub parity: SerialParity,
    /// Stop bits (1 or 2)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Flow control mode
    #[serde(default)]
    pub flow_control: SerialFlowControl,
    /// Timeout of a single transport read
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Deadline for a complete reply line
    #[serde(default = "default_reply_timeout", with = "humantime_serde")]
    pub reply_timeout: Duration,
    /// Pause after opening before the buffers are flushed
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    pub settle_delay: Duration,
}

impl ConnectionConfig {
    /// 8N1 without flow control, the default for pumps and valve actuators.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            flow_control: SerialFlowControl::None,
            read_timeout: default_read_timeout(),
            reply_timeout: default_reply_timeout(),
            settle_delay: default_settle_delay(),
        }
    }

    /// Override data bits, parity and stop bits.
    pub fn with_framing(mut self, data_bits: u8, parity: SerialParity, stop_bits: u8) -> Self {
        self.data_bits = data_bits;
        self.parity = parity;
        self.stop_bits = stop_bits;
        self
    }

    /// Override the reply deadline.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Override the pause after opening.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Framing in "8N1" notation.
    pub fn framing(&self) -> String {
        format!("{}{}{}", self.data_bits, self.parity.code(), self.stop_bits)
    }

    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("port path is empty".to_string());
        }
        if self.baud_rate == 0 {
            return Err(format!("'{}': baud rate must be positive", self.path));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(format!("'{}': data bits must be 5-8", self.path));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(format!("'{}': stop bits must be 1 or 2", self.path));
        }
        if self.reply_timeout.is_zero() {
            return Err(format!("'{}': reply timeout must be positive", self.path));
        }
        Ok(())
    }
}

/// Instrument families with a built-in command vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// WPI Aladdin syringe pump
    SyringePump,
    /// VICI multiposition valve actuator
    SelectorValve,
    /// IKA stirring/heating plate speaking NAMUR
    HotPlate,
}

/// One instrument entry in the settings file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Unique name used to look the device up
    pub name: String,
    /// Instrument family
    pub kind: DeviceKind,
    /// Serial port (e.g., "/dev/ttyUSB1")
    pub port: String,
    /// Baud rate, 9600 unless set
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Some plate models need two stop bits
    #[serde(default)]
    pub stop_bits: Option<u8>,
    /// Reply deadline override, e.g. "2s"
    #[serde(default, with = "humantime_serde")]
    pub reply_timeout: Option<Duration>,
    /// Interval between status polls
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl DeviceSettings {
    /// Build the device profile for this entry, applying its overrides.
    pub fn profile(&self) -> DeviceProfile {
        let mut profile = match self.kind {
            DeviceKind::SyringePump => devices::aladdin::profile(&self.port, self.baud_rate),
            DeviceKind::SelectorValve => devices::vici::profile(&self.port, self.baud_rate),
            DeviceKind::HotPlate => devices::ika::profile(&self.port, self.baud_rate),
        };
        if let Some(stop_bits) = self.stop_bits {
            profile.connection.stop_bits = stop_bits;
        }
        if let Some(timeout) = self.reply_timeout {
            profile.connection.reply_timeout = timeout;
        }
        profile
    }
}

/// Top-level settings: the instruments of one bench
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Configured instruments
    #[serde(default)]
    pub devices: Vec<DeviceSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            devices: Vec::new(),
        }
    }
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> SerialParity {
    SerialParity::None
}

fn default_stop_bits() -> u8 {
    1
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(50)
}

fn default_reply_timeout() -> Duration {
    Duration::from_millis(500)
}

fn default_settle_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from a TOML file, then `LABSERIAL_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if the file cannot be parsed or validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::extract(Figment::new().merge(Toml::file(path.as_ref())))
    }

    /// Parse settings from a TOML string, then `LABSERIAL_` environment variables.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::extract(Figment::new().merge(Toml::string(content)))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Self = figment
            .merge(Env::prefixed("LABSERIAL_").split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadError(Box::new(e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings after loading
    ///
    /// Checks:
    /// - Device names are unique and non-empty
    /// - Every device's connection parameters are usable
    /// - Poll intervals are positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "device name must not be empty".to_string(),
                ));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate device name '{}'",
                    device.name
                )));
            }
            if device.poll_interval.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "'{}': poll interval must be positive",
                    device.name
                )));
            }
            device
                .profile()
                .connection
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("'{}': {}", device.name, e)))?;
        }
        Ok(())
    }

    /// Look up a device entry by name.
    pub fn device(&self, name: &str) -> Option<&DeviceSettings> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Serialize back to TOML, e.g. to write a starter file.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
