//! Synchronous drivers for RS-232 laboratory instruments.
//!
//! The core is [`instrument::SerialCommandDevice`]: one serial connection, a
//! static table of named command templates, blocking request/response
//! exchanges and a bounded status-polling loop. Instrument families
//! (syringe pump, valve actuator, NAMUR plates) are configuration over it in
//! [`devices`]; multi-step runs live in [`procedures`].

#![deny(missing_docs)]

pub mod adapters;
pub mod config;
pub mod devices;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod procedures;

pub use error::{DeviceError, DeviceResult};
pub use instrument::{CommandArgs, DeviceProfile, PollSettings, SerialCommandDevice, StatusReply};
