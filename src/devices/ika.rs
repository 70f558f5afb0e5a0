//! IKA stirring/heating plates (RET control-visc, RCT digital) over NAMUR
//!
//! ## Protocol
//!
//! - 7E1 @ 9600 baud, no flow control (some models need two stop bits)
//! - Command: `<command><CR><LF>`
//! - Reply: `<value> <function><CR><LF>`, e.g. `"25.4 2"`
//! - Functions are addressed by number, see [`Function`]
//! - Setpoint writes, `START`/`STOP` and `RESET` are not answered

use crate::config::{ConnectionConfig, SerialParity};
use crate::devices::check_range;
use crate::error::{DeviceError, DeviceResult};
use crate::instrument::{
    CommandArgs, CommandTable, DeviceProfile, PollSettings, ReplyFraming, SerialCommandDevice,
    StatusReply,
};
use std::time::Duration;

/// NAMUR command vocabulary.
pub fn command_table() -> CommandTable {
    CommandTable::builder()
        // Identification
        .command("IN_TYPE", "IN_TYPE")
        .command("IN_NAME", "IN_NAME")
        .command("IN_SOFTWARE_ID", "IN_SOFTWARE_ID")
        // Read actual value / setpoint of function x
        .command("IN_PV", "IN_PV_{x}")
        .command("IN_SP", "IN_SP_{x}")
        // Write setpoint, not answered
        .silent("OUT_SP", "OUT_SP_{x}@{val}")
        // Remote on/off for function x, not answered
        .silent("START", "START_{x}")
        .silent("STOP", "STOP_{x}")
        // Watchdog modes
        .command("OUT_WD1", "OUT_WD1@{sec}")
        .command("OUT_WD2", "OUT_WD2@{sec}")
        .silent("RESET", "RESET")
        .command("STATUS_90", "STATUS_90")
        .build()
}

/// Profile for a plate on `port` (7E1, CRLF commands, LF-terminated replies).
pub fn profile(port: &str, baud_rate: u32) -> DeviceProfile {
    DeviceProfile {
        label: "ika".to_string(),
        connection: ConnectionConfig::new(port, baud_rate).with_framing(7, SerialParity::Even, 1),
        command_terminator: "\r\n".to_string(),
        framing: ReplyFraming::line(b'\n').with_stx_etx(),
        table: command_table(),
        silent_settle: Duration::from_millis(50),
    }
}

/// NAMUR function numbers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    /// Medium temperature (°C)
    MediumTemperature = 1,
    /// Hotplate temperature (°C)
    PlateTemperature = 2,
    /// Stirring speed (rpm)
    StirringSpeed = 4,
    /// Viscosity trend value
    ViscosityTrend = 5,
    /// Carrier temperature (°C)
    CarrierTemperature = 7,
    /// pH reading
    Ph = 80,
    /// Scale reading (g)
    Weight = 90,
}

impl Function {
    /// Function number used in the command suffix
    pub fn number(self) -> i64 {
        self as i64
    }
}

/// Watchdog behaviour when the data flow stops
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogMode {
    /// Switch stirring and heating off
    SwitchOff,
    /// Fall back to the safety setpoints
    SafeLimits,
}

/// Predicate: the reading is within `tolerance` of `target`.
pub fn within(target: f64, tolerance: f64) -> impl Fn(&StatusReply) -> bool {
    move |reply| reply.value().is_some_and(|v| (v - target).abs() <= tolerance)
}

fn function_args(function: Function) -> CommandArgs {
    CommandArgs::new().int("x", function.number())
}

fn numeric(command: &str, reply: StatusReply) -> DeviceResult<f64> {
    reply.value().ok_or_else(|| DeviceError::UnexpectedReply {
        command: command.to_string(),
        reply: reply.raw().to_string(),
    })
}

/// Model identification, e.g. `IKARET` or `RCT…`.
pub fn detect_model(device: &mut SerialCommandDevice) -> DeviceResult<String> {
    let reply = device.query("IN_TYPE", &CommandArgs::new())?;
    Ok(reply.raw().to_string())
}

/// Device name as reported by `IN_NAME`.
pub fn name(device: &mut SerialCommandDevice) -> DeviceResult<String> {
    let reply = device.query("IN_NAME", &CommandArgs::new())?;
    Ok(reply.raw().to_string())
}

/// Current value of `function`.
pub fn actual(device: &mut SerialCommandDevice, function: Function) -> DeviceResult<f64> {
    let reply = device.query("IN_PV", &function_args(function))?;
    numeric("IN_PV", reply)
}

/// Setpoint of `function`.
pub fn setpoint(device: &mut SerialCommandDevice, function: Function) -> DeviceResult<f64> {
    let reply = device.query("IN_SP", &function_args(function))?;
    numeric("IN_SP", reply)
}

/// Write a setpoint for `function`.
pub fn set_setpoint(
    device: &mut SerialCommandDevice,
    function: Function,
    value: f64,
) -> DeviceResult<StatusReply> {
    device.query("OUT_SP", &function_args(function).float("val", value))
}

/// Switch remote control of `function` on (e.g. stirring, heating, scale).
pub fn remote_on(device: &mut SerialCommandDevice, function: Function) -> DeviceResult<StatusReply> {
    device.query("START", &function_args(function))
}

/// Switch remote control of `function` off.
pub fn remote_off(device: &mut SerialCommandDevice, function: Function) -> DeviceResult<StatusReply> {
    device.query("STOP", &function_args(function))
}

/// Turn off all remote functions.
pub fn reset(device: &mut SerialCommandDevice) -> DeviceResult<StatusReply> {
    device.query("RESET", &CommandArgs::new())
}

/// Arm the data-flow watchdog (timeout 20-1500 s).
pub fn set_watchdog(
    device: &mut SerialCommandDevice,
    mode: WatchdogMode,
    timeout_secs: u16,
) -> DeviceResult<StatusReply> {
    check_range("watchdog timeout (s)", timeout_secs, 20, 1500)?;
    let command = match mode {
        WatchdogMode::SwitchOff => "OUT_WD1",
        WatchdogMode::SafeLimits => "OUT_WD2",
    };
    device.query(command, &CommandArgs::new().int("sec", i64::from(timeout_secs)))
}

/// Scale status bits (models with a scale).
pub fn scale_status(device: &mut SerialCommandDevice) -> DeviceResult<StatusReply> {
    device.query("STATUS_90", &CommandArgs::new())
}

/// Poll `function` until it reads within `tolerance` of `target`.
pub fn wait_for_value(
    device: &mut SerialCommandDevice,
    function: Function,
    target: f64,
    tolerance: f64,
    settings: PollSettings,
) -> DeviceResult<StatusReply> {
    device.poll_until("IN_PV", &function_args(function), within(target, tolerance), settings)
}
