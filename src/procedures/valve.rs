//! Valve port selection.

use crate::devices::vici::{self, ActuatorMode};
use crate::error::DeviceError;
use crate::instrument::{PollSettings, SerialCommandDevice, StatusReply};
use anyhow::{Context, Result};
use tracing::info;

/// Configure a `positions`-way valve in multiposition mode, home it, move to
/// `port` and wait until `CP` confirms the position.
pub fn select_port(
    device: &mut SerialCommandDevice,
    positions: u8,
    port: u8,
    settings: PollSettings,
) -> Result<StatusReply> {
    if port == 0 || port > positions {
        return Err(DeviceError::InvalidArgument(format!(
            "port {} outside 1-{}",
            port, positions
        )))
        .context("Invalid valve port");
    }

    vici::set_mode(device, ActuatorMode::Multiposition).context("Failed to set multiposition mode")?;
    vici::set_positions(device, positions)
        .with_context(|| format!("Failed to set {} positions", positions))?;
    vici::home(device).context("Failed to home valve")?;
    vici::go_to(device, port).with_context(|| format!("Failed to move to port {}", port))?;

    let reply = vici::wait_for_position(device, port, settings)
        .with_context(|| format!("Valve did not reach port {}", port))?;
    info!("Valve at port {} ({})", port, reply);
    Ok(reply)
}
