//! Generic command/response instrument driver.
//!
//! One [`SerialCommandDevice`] owns one serial connection. Everything
//! device-specific (framing, terminators, the command vocabulary) arrives
//! through a [`DeviceProfile`]; completion conditions are predicates passed
//! to [`SerialCommandDevice::poll_until`].

pub mod command_table;
pub mod device;
pub mod poll;
pub mod reply;

pub use command_table::{
    CommandArg, CommandArgs, CommandSpec, CommandTable, CommandTableBuilder, ReplyMode,
};
pub use device::{DeviceProfile, SerialCommandDevice};
pub use poll::{Clock, ManualClock, PollSettings, SystemClock};
pub use reply::{ReplyFraming, StatusReply};
