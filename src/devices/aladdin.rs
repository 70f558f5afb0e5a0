//! WPI Aladdin syringe pump
//!
//! ## Protocol
//!
//! - 8N1 @ 9600 baud, no flow control
//! - Command: `<command>[parameter]<CR>`
//! - Reply: `<STX><address:2><status>[data]<ETX>`
//! - Status: `I` infusing, `W` withdrawing, `S` stopped, `P` paused,
//!   `T` pause phase, `U` waiting for trigger, `X` purging, `A?` alarm
//!
//! Volumes are in mL and rates in mL/min once the unit selectors
//! `UNITS_ML` / `RATE_UNITS_ML_MIN` have been sent.

use crate::config::ConnectionConfig;
use crate::devices::check_range;
use crate::error::{DeviceError, DeviceResult};
use crate::instrument::{
    CommandArgs, CommandTable, DeviceProfile, PollSettings, ReplyFraming, SerialCommandDevice,
    StatusReply,
};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Reply terminator
pub const ETX: u8 = 0x03;

/// Status query used while waiting for a run to finish
pub const STATUS_QUERY: &str = "FUN";

/// Pump command vocabulary.
pub fn command_table() -> CommandTable {
    CommandTable::builder()
        // No-parameter commands
        .command("VER", "VER")
        .command("FUN", "FUN")
        .command("RUN", "RUN")
        .command("STP", "STP")
        .command("REL", "REL")
        .command("HOM", "HOM")
        .command("RTR", "RTR")
        .command("PRT", "PRT")
        .command("EEP", "EEP")
        .command("SAV", "SAV")
        .command("ALM?", "ALM?")
        // Unit selectors
        .command("UNITS_ML", "VOL ML")
        .command("RATE_UNITS_ML_MIN", "RAT 0 MM")
        // Parameterized commands
        .command("DIA", "DIA{param:.2}")
        .command("VOL", "VOL{param:.3}")
        .command("RAT", "RAT{param:.3}")
        .command("DIR_INF", "DIR INF")
        .command("DIR_WDR", "DIR WDR")
        .command("DIR", "DIR {param}")
        .command("SAF", "SAF{param}")
        .command("TMO", "TMO{param}")
        .command("ADR", "ADR{param}")
        .command("BAU", "BAU{param}")
        .command("BEO", "BEO{param}")
        .command("FSF", "FSF{param}")
        .build()
}

/// Profile for a pump on `port` (8N1, CR-terminated commands, STX/ETX replies).
pub fn profile(port: &str, baud_rate: u32) -> DeviceProfile {
    DeviceProfile {
        label: "aladdin".to_string(),
        connection: ConnectionConfig::new(port, baud_rate),
        command_terminator: "\r".to_string(),
        framing: ReplyFraming::line(ETX).with_stx_etx().with_address_prefix(),
        table: command_table(),
        silent_settle: Duration::from_millis(50),
    }
}

/// Pumping direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// `INF`
    Infuse,
    /// `WDR`
    Withdraw,
}

impl Direction {
    /// Wire form used by `DIR`
    pub fn as_wire(self) -> &'static str {
        match self {
            Direction::Infuse => "INF",
            Direction::Withdraw => "WDR",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for Direction {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INF" => Ok(Direction::Infuse),
            "WDR" => Ok(Direction::Withdraw),
            other => Err(DeviceError::InvalidArgument(format!(
                "direction must be 'INF' or 'WDR', got '{}'",
                other
            ))),
        }
    }
}

/// Pump state decoded from the status character of a reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PumpStatus {
    /// `I`
    Infusing,
    /// `W`
    Withdrawing,
    /// `S`
    Stopped,
    /// `P`
    Paused,
    /// `T`, inside a programmed pause phase
    PausePhase,
    /// `U`
    WaitingForTrigger,
    /// `X`
    Purging,
    /// Alarm code (e.g. "R" reset, "S" stalled, "T" timeout)
    Alarm(String),
}

impl PumpStatus {
    /// Decode the leading status of a de-framed reply.
    pub fn from_reply(reply: &StatusReply) -> Option<Self> {
        let raw = reply.raw();
        let mut chars = raw.chars();
        let status = match chars.next()? {
            'I' => PumpStatus::Infusing,
            'W' => PumpStatus::Withdrawing,
            'S' => PumpStatus::Stopped,
            'P' => PumpStatus::Paused,
            'T' => PumpStatus::PausePhase,
            'U' => PumpStatus::WaitingForTrigger,
            'X' => PumpStatus::Purging,
            'A' if raw.len() >= 3 && raw[1..].starts_with('?') => {
                PumpStatus::Alarm(raw[2..].trim().to_string())
            }
            _ => return None,
        };
        Some(status)
    }
}

/// A run has ended: the pump reports `END…` or the stopped status `S…`.
pub fn is_idle(reply: &StatusReply) -> bool {
    reply.starts_with("END") || reply.starts_with("S")
}

/// Firmware replies look like `SNE1000V3.930`.
pub fn is_valid_firmware(reply: &StatusReply) -> bool {
    reply.starts_with("SNE")
}

/// Query firmware and check that a pump answered.
pub fn verify(device: &mut SerialCommandDevice) -> DeviceResult<StatusReply> {
    let reply = device.query("VER", &CommandArgs::new())?;
    if !is_valid_firmware(&reply) {
        return Err(DeviceError::UnexpectedReply {
            command: "VER".to_string(),
            reply: reply.raw().to_string(),
        });
    }
    Ok(reply)
}

/// Select mL and mL/min as volume and rate units.
pub fn use_millilitre_units(device: &mut SerialCommandDevice) -> DeviceResult<()> {
    device.query("UNITS_ML", &CommandArgs::new())?;
    device.query("RATE_UNITS_ML_MIN", &CommandArgs::new())?;
    Ok(())
}

/// Set syringe inner diameter (mm).
pub fn set_diameter(device: &mut SerialCommandDevice, diameter_mm: f64) -> DeviceResult<StatusReply> {
    check_range("diameter (mm)", diameter_mm, 0.1, 50.0)?;
    device.query("DIA", &CommandArgs::new().float("param", diameter_mm))
}

/// Set infusion/withdrawal volume (mL).
pub fn set_volume(device: &mut SerialCommandDevice, volume_ml: f64) -> DeviceResult<StatusReply> {
    if volume_ml <= 0.0 {
        return Err(DeviceError::InvalidArgument(format!(
            "volume must be positive, got {}",
            volume_ml
        )));
    }
    device.query("VOL", &CommandArgs::new().float("param", volume_ml))
}

/// Set infusion/withdrawal rate (mL/min).
pub fn set_rate(device: &mut SerialCommandDevice, rate_ml_per_min: f64) -> DeviceResult<StatusReply> {
    if rate_ml_per_min <= 0.0 {
        return Err(DeviceError::InvalidArgument(format!(
            "rate must be positive, got {}",
            rate_ml_per_min
        )));
    }
    device.query("RAT", &CommandArgs::new().float("param", rate_ml_per_min))
}

/// Set the pumping direction.
pub fn set_direction(device: &mut SerialCommandDevice, direction: Direction) -> DeviceResult<StatusReply> {
    device.query("DIR", &CommandArgs::new().text("param", direction.as_wire()))
}

/// Start the pumping program.
pub fn run(device: &mut SerialCommandDevice) -> DeviceResult<StatusReply> {
    device.query("RUN", &CommandArgs::new())
}

/// Emergency stop.
pub fn stop(device: &mut SerialCommandDevice) -> DeviceResult<StatusReply> {
    device.query("STP", &CommandArgs::new())
}

/// Withdraw the plunger to its home position.
pub fn home(device: &mut SerialCommandDevice) -> DeviceResult<StatusReply> {
    device.query("HOM", &CommandArgs::new())
}

/// Safe mode: the pump stops if no command arrives within `timeout_secs`. 0 turns it off.
pub fn safe_mode(device: &mut SerialCommandDevice, timeout_secs: u8) -> DeviceResult<StatusReply> {
    device.query("SAF", &CommandArgs::new().int("param", i64::from(timeout_secs)))
}

/// Set the pump's network address (0-99).
pub fn set_address(device: &mut SerialCommandDevice, address: u8) -> DeviceResult<StatusReply> {
    check_range("address", address, 0, 99)?;
    device.query("ADR", &CommandArgs::new().text("param", format!("{:02}", address)))
}

/// Current pump state, `None` if the status is not recognised.
pub fn status(device: &mut SerialCommandDevice) -> DeviceResult<Option<PumpStatus>> {
    let reply = device.query(STATUS_QUERY, &CommandArgs::new())?;
    Ok(PumpStatus::from_reply(&reply))
}

/// Poll the status query until the pump reports idle.
pub fn wait_until_idle(
    device: &mut SerialCommandDevice,
    settings: PollSettings,
) -> DeviceResult<StatusReply> {
    device.poll_until(STATUS_QUERY, &CommandArgs::new(), is_idle, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_framing() {
        let profile = profile("/dev/ttyUSB0", 9600);
        assert_eq!(profile.connection.framing(), "8N1");
        assert_eq!(profile.command_terminator, "\r");
        assert_eq!(profile.framing.strip("\u{2}00S\u{3}"), "S");
    }

    #[test]
    fn test_parameter_formatting() {
        let table = command_table();
        let dia = table
            .render("DIA", &CommandArgs::new().float("param", 4.61))
            .unwrap();
        assert_eq!(dia, "DIA4.61");
        let vol = table
            .render("VOL", &CommandArgs::new().float("param", 20.0))
            .unwrap();
        assert_eq!(vol, "VOL20.000");
        let rate = table
            .render("RAT", &CommandArgs::new().float("param", 5.0))
            .unwrap();
        assert_eq!(rate, "RAT5.000");
        assert_eq!(
            table.render("RATE_UNITS_ML_MIN", &CommandArgs::new()).unwrap(),
            "RAT 0 MM"
        );
    }

    #[test]
    fn test_idle_predicate() {
        assert!(is_idle(&StatusReply::parse("S")));
        assert!(is_idle(&StatusReply::parse("END")));
        assert!(!is_idle(&StatusReply::parse("I")));
        assert!(!is_idle(&StatusReply::parse("W")));
    }

    #[test]
    fn test_pump_status_decoding() {
        assert_eq!(
            PumpStatus::from_reply(&StatusReply::parse("I")),
            Some(PumpStatus::Infusing)
        );
        assert_eq!(
            PumpStatus::from_reply(&StatusReply::parse("A?S")),
            Some(PumpStatus::Alarm("S".to_string()))
        );
        assert_eq!(PumpStatus::from_reply(&StatusReply::parse("")), None);
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("INF".parse::<Direction>().unwrap(), Direction::Infuse);
        assert_eq!(Direction::Withdraw.to_string(), "WDR");
        assert!("UP".parse::<Direction>().is_err());
    }
}
