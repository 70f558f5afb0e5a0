//! Stirring and heating runs on a NAMUR plate.

use crate::devices::ika::{self, Function};
use crate::instrument::{PollSettings, SerialCommandDevice, StatusReply};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

/// Set `function` to `setpoint`, switch it on for `duration`, then off again.
fn timed_run(
    device: &mut SerialCommandDevice,
    function: Function,
    setpoint: f64,
    duration: Duration,
) -> Result<()> {
    let actual = ika::actual(device, function)
        .with_context(|| format!("Failed to read {:?}", function))?;
    info!("{:?} currently {}", function, actual);

    ika::set_setpoint(device, function, setpoint)
        .with_context(|| format!("Failed to set {:?} to {}", function, setpoint))?;
    ika::remote_on(device, function).with_context(|| format!("Failed to start {:?}", function))?;

    device.pause(duration);

    ika::remote_off(device, function).with_context(|| format!("Failed to stop {:?}", function))?;
    Ok(())
}

/// Stir at `rpm` for `duration`.
pub fn stir_for(device: &mut SerialCommandDevice, rpm: f64, duration: Duration) -> Result<()> {
    timed_run(device, Function::StirringSpeed, rpm, duration)
}

/// Heat the plate to `celsius` for `duration`.
pub fn heat_for(device: &mut SerialCommandDevice, celsius: f64, duration: Duration) -> Result<()> {
    timed_run(device, Function::PlateTemperature, celsius, duration)
}

/// Wait until `function` reads within `tolerance` of `target`.
pub fn wait_for_temperature(
    device: &mut SerialCommandDevice,
    function: Function,
    target: f64,
    tolerance: f64,
    settings: PollSettings,
) -> Result<StatusReply> {
    ika::wait_for_value(device, function, target, tolerance, settings)
        .with_context(|| format!("{:?} did not reach {} ± {}", function, target, tolerance))
}

/// Switch every remote function off.
pub fn reset_plate(device: &mut SerialCommandDevice) -> Result<()> {
    ika::reset(device).context("Failed to reset plate")?;
    Ok(())
}
