//! Syringe pump transfer run (infusion or withdrawal).

use crate::devices::aladdin::{self, Direction};
use crate::instrument::{PollSettings, SerialCommandDevice, StatusReply};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

/// How long homing may take before the run is abandoned
pub const HOMING_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameters of one transfer run
#[derive(Clone, Debug, PartialEq)]
pub struct TransferPlan {
    /// Syringe inner diameter (mm)
    pub diameter_mm: f64,
    /// Volume to move (mL)
    pub volume_ml: f64,
    /// Rate (mL/min)
    pub rate_ml_per_min: f64,
    /// Infuse or withdraw
    pub direction: Direction,
    /// Upper bound on the pumping phase
    pub max_wait: Duration,
    /// Interval between status polls
    pub poll_interval: Duration,
}

impl Default for TransferPlan {
    fn default() -> Self {
        Self {
            diameter_mm: 4.61,
            volume_ml: 20.0,
            rate_ml_per_min: 5.0,
            direction: Direction::Infuse,
            max_wait: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl TransferPlan {
    /// Infusion with the default syringe.
    pub fn infuse(volume_ml: f64, rate_ml_per_min: f64) -> Self {
        Self {
            volume_ml,
            rate_ml_per_min,
            ..Self::default()
        }
    }

    /// Withdrawal with the default syringe.
    pub fn withdraw(volume_ml: f64, rate_ml_per_min: f64) -> Self {
        Self {
            direction: Direction::Withdraw,
            ..Self::infuse(volume_ml, rate_ml_per_min)
        }
    }

    /// Use a different syringe.
    pub fn with_diameter(mut self, diameter_mm: f64) -> Self {
        self.diameter_mm = diameter_mm;
        self
    }

    /// Override the bound on the pumping phase.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Send STP after a failed wait; the wait's error is what gets reported.
fn stop_after_failure(device: &mut SerialCommandDevice) {
    if let Err(e) = aladdin::stop(device) {
        warn!("Stop after failed wait was not acknowledged: {}", e);
    } else {
        info!("STP sent after failed wait");
    }
}

/// Verify, home, program and run the pump, then wait for it to go idle.
///
/// The pump is stopped at the end of the run, and also when either wait
/// (homing or pumping) runs out of time.
pub fn run_transfer(device: &mut SerialCommandDevice, plan: &TransferPlan) -> Result<StatusReply> {
    let firmware = aladdin::verify(device).context("Pump did not identify itself")?;
    info!("Pump firmware: {}", firmware);

    aladdin::use_millilitre_units(device).context("Failed to select mL units")?;

    aladdin::home(device).context("Failed to send HOM")?;
    let homing = PollSettings::new(plan.poll_interval, HOMING_TIMEOUT);
    if let Err(e) = aladdin::wait_until_idle(device, homing) {
        stop_after_failure(device);
        return Err(e).context("Homing did not complete; check syringe and drive");
    }
    info!("Homing complete");

    aladdin::set_diameter(device, plan.diameter_mm)
        .with_context(|| format!("Failed to set diameter {:.2} mm", plan.diameter_mm))?;
    aladdin::set_volume(device, plan.volume_ml)
        .with_context(|| format!("Failed to set volume {:.3} mL", plan.volume_ml))?;
    aladdin::set_rate(device, plan.rate_ml_per_min)
        .with_context(|| format!("Failed to set rate {:.3} mL/min", plan.rate_ml_per_min))?;
    aladdin::set_direction(device, plan.direction)
        .with_context(|| format!("Failed to set direction {}", plan.direction))?;

    aladdin::run(device).context("Failed to start pump")?;
    info!(
        "Pumping {:.3} mL ({}) at {:.3} mL/min, waiting up to {:?}",
        plan.volume_ml, plan.direction, plan.rate_ml_per_min, plan.max_wait
    );

    let pumping = PollSettings::new(plan.poll_interval, plan.max_wait);
    let idle = match aladdin::wait_until_idle(device, pumping) {
        Ok(reply) => reply,
        Err(e) => {
            stop_after_failure(device);
            return Err(e).context("Pump did not finish; check syringe seating, diameter and rate");
        }
    };
    info!("Pump idle: {}", idle);

    aladdin::stop(device).context("Failed to send final STP")?;
    Ok(idle)
}
