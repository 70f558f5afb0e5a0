//! VICI multiposition (10+1) MU valve actuator
//!
//! ## Protocol
//!
//! - 8N1 @ 9600 baud, no flow control
//! - Command: `<command>[value]<CR>`, reply: `<text><CR>`
//! - Movement commands (`HM`, `GO`, `CW`, `CC`, `TO`, `TT`) and `LRN` are not
//!   answered; completion is confirmed by polling `CP`
//!   (`"Position is = 5"`).

use crate::config::ConnectionConfig;
use crate::devices::check_range;
use crate::error::DeviceResult;
use crate::instrument::{
    CommandArgs, CommandTable, DeviceProfile, PollSettings, ReplyFraming, SerialCommandDevice,
    StatusReply,
};
use std::time::Duration;

/// Position query used while waiting for a move
pub const POSITION_QUERY: &str = "CP";

/// Baud rates the actuator can be switched to
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [4800, 9600, 19200, 38400, 57600, 115200];

/// Actuator command vocabulary.
pub fn command_table() -> CommandTable {
    CommandTable::builder()
        // Basic actuator commands
        .command("AL", "AL")
        .silent("HM", "HM")
        .command("CP", "CP")
        .command("STAT", "STAT")
        .command("VR", "VR")
        .command("VR_BOARD", "VR{board}")
        // Mode and configuration
        .command("AM", "AM")
        .command("AM_SET", "AM{mode}")
        .command("NP", "NP")
        .command("NP_SET", "NP{count}")
        .command("SO", "SO")
        .command("SO_SET", "SO{offset}")
        .command("SB", "SB")
        .command("SB_SET", "SB{baud}")
        // Movement, not answered
        .silent("CW", "CW")
        .silent("CW_TO", "CW{pos}")
        .silent("CC", "CC")
        .silent("CC_TO", "CC{pos}")
        .silent("GO", "GO")
        .silent("GO_TO", "GO{pos}")
        .silent("TO", "TO")
        .silent("TT", "TT")
        // Counters and timers
        .command("CNT", "CNT")
        .command("CNT_SET", "CNT{value}")
        .command("DT", "DT")
        .command("DT_SET", "DT{ms}")
        .command("TM", "TM")
        // Response format
        .command("IFM", "IFM")
        .command("IFM_SET", "IFM{mode}")
        .command("LG", "LG")
        .command("LG_SET", "LG{format}")
        // Utility
        .silent("LRN", "LRN")
        .command("MA", "MA {assembly}")
        .command("ID", "ID{id}")
        .command("HELP", "?")
        .build()
}

/// Profile for an actuator on `port` (8N1, CR both ways).
pub fn profile(port: &str, baud_rate: u32) -> DeviceProfile {
    DeviceProfile {
        label: "vici".to_string(),
        connection: ConnectionConfig::new(port, baud_rate),
        command_terminator: "\r".to_string(),
        framing: ReplyFraming::line(b'\r'),
        table: command_table(),
        silent_settle: Duration::from_millis(50),
    }
}

/// Actuator operating mode (`AMn`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActuatorMode {
    /// Two positions, mechanical stops learned with `LRN`
    TwoPositionWithStops = 1,
    /// Two positions without stops
    TwoPositionWithoutStops = 2,
    /// Multiposition valve
    Multiposition = 3,
}

/// Motor assembly type (`MA`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorAssembly {
    /// EMH
    Emh,
    /// EMD
    Emd,
    /// EMT
    Emt,
}

impl MotorAssembly {
    /// Wire form used by `MA`
    pub fn as_wire(self) -> &'static str {
        match self {
            MotorAssembly::Emh => "EMH",
            MotorAssembly::Emd => "EMD",
            MotorAssembly::Emt => "EMT",
        }
    }
}

/// Reply strings sent by the actuator (`IFMn`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    /// No reply strings
    None = 0,
    /// Basic replies
    Basic = 1,
    /// Extended replies
    Extended = 2,
}

/// Predicate: the position reported by `CP` equals `target`.
pub fn at_position(target: u8) -> impl Fn(&StatusReply) -> bool {
    move |reply| reply.trailing_integer() == Some(i64::from(target))
}

/// Set the operating mode.
pub fn set_mode(device: &mut SerialCommandDevice, mode: ActuatorMode) -> DeviceResult<StatusReply> {
    device.query("AM_SET", &CommandArgs::new().int("mode", mode as i64))
}

/// Set the number of valve positions (2-96).
pub fn set_positions(device: &mut SerialCommandDevice, count: u8) -> DeviceResult<StatusReply> {
    check_range("number of positions", count, 2, 96)?;
    device.query("NP_SET", &CommandArgs::new().int("count", i64::from(count)))
}

/// Set the first position number (1-96).
pub fn set_offset(device: &mut SerialCommandDevice, offset: u8) -> DeviceResult<StatusReply> {
    check_range("offset", offset, 1, 96)?;
    device.query("SO_SET", &CommandArgs::new().int("offset", i64::from(offset)))
}

/// Switch the actuator to one of [`SUPPORTED_BAUD_RATES`].
pub fn set_baud(device: &mut SerialCommandDevice, baud: u32) -> DeviceResult<StatusReply> {
    if !SUPPORTED_BAUD_RATES.contains(&baud) {
        return Err(crate::error::DeviceError::InvalidArgument(format!(
            "unsupported actuator baud rate {}",
            baud
        )));
    }
    device.query("SB_SET", &CommandArgs::new().int("baud", i64::from(baud)))
}

/// Move to position 1.
pub fn home(device: &mut SerialCommandDevice) -> DeviceResult<()> {
    device.execute("HM", &CommandArgs::new())
}

/// Move to `pos` by the shortest route (multiposition mode).
pub fn go_to(device: &mut SerialCommandDevice, pos: u8) -> DeviceResult<()> {
    check_range("position", pos, 1, 96)?;
    device.execute("GO_TO", &CommandArgs::new().int("pos", i64::from(pos)))
}

/// Toggle to the opposite position (two-position modes).
pub fn toggle(device: &mut SerialCommandDevice) -> DeviceResult<()> {
    device.execute("TO", &CommandArgs::new())
}

/// Current position, if the reply carries one.
pub fn position(device: &mut SerialCommandDevice) -> DeviceResult<Option<i64>> {
    let reply = device.query(POSITION_QUERY, &CommandArgs::new())?;
    Ok(reply.trailing_integer())
}

/// Set the actuation counter.
pub fn reset_counter(device: &mut SerialCommandDevice, value: u16) -> DeviceResult<StatusReply> {
    device.query("CNT_SET", &CommandArgs::new().int("value", i64::from(value)))
}

/// Set the timed-toggle delay (0-65000 ms).
pub fn set_delay(device: &mut SerialCommandDevice, ms: u32) -> DeviceResult<StatusReply> {
    check_range("delay (ms)", ms, 0, 65_000)?;
    device.query("DT_SET", &CommandArgs::new().int("ms", i64::from(ms)))
}

/// Select the reply strings (`IFMn`).
pub fn set_response_mode(device: &mut SerialCommandDevice, mode: ResponseMode) -> DeviceResult<StatusReply> {
    device.query("IFM_SET", &CommandArgs::new().int("mode", mode as i64))
}

/// Declare the fitted motor assembly.
pub fn set_motor(device: &mut SerialCommandDevice, assembly: MotorAssembly) -> DeviceResult<StatusReply> {
    device.query("MA", &CommandArgs::new().text("assembly", assembly.as_wire()))
}

/// Learn the A and B mechanical stops (two-position with stops only).
pub fn learn_stops(device: &mut SerialCommandDevice) -> DeviceResult<()> {
    device.execute("LRN", &CommandArgs::new())
}

/// Poll `CP` until the actuator reports `target`.
pub fn wait_for_position(
    device: &mut SerialCommandDevice,
    target: u8,
    settings: PollSettings,
) -> DeviceResult<StatusReply> {
    device.poll_until(POSITION_QUERY, &CommandArgs::new(), at_position(target), settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_commands_are_silent() {
        let table = command_table();
        for name in ["HM", "CW", "CW_TO", "CC", "CC_TO", "GO", "GO_TO", "TO", "TT", "LRN"] {
            assert_eq!(
                table.get(name).unwrap().reply,
                crate::instrument::ReplyMode::Silent,
                "{} should not expect a reply",
                name
            );
        }
        assert_eq!(
            table.get("CP").unwrap().reply,
            crate::instrument::ReplyMode::Line
        );
    }

    #[test]
    fn test_at_position_predicate() {
        let at_five = at_position(5);
        assert!(at_five(&StatusReply::parse("Position is = 5")));
        assert!(!at_five(&StatusReply::parse("Position is = 15")));
        assert!(!at_five(&StatusReply::parse("")));
    }

    #[test]
    fn test_wire_strings() {
        let table = command_table();
        assert_eq!(
            table.render("GO_TO", &CommandArgs::new().int("pos", 5)).unwrap(),
            "GO5"
        );
        assert_eq!(
            table
                .render("MA", &CommandArgs::new().text("assembly", MotorAssembly::Emt.as_wire()))
                .unwrap(),
            "MA EMT"
        );
        assert_eq!(table.render("HELP", &CommandArgs::new()).unwrap(), "?");
    }
}
