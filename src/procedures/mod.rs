//! Multi-step instrument procedures.
//!
//! Each procedure is a fixed call sequence over the typed helpers in
//! [`crate::devices`]. They return `anyhow::Result` so that a failure names
//! the step it happened in, while the underlying [`crate::error::DeviceError`]
//! stays reachable through `downcast_ref`.

pub mod plate;
pub mod pump;
pub mod valve;

pub use plate::{heat_for, reset_plate, stir_for, wait_for_temperature};
pub use pump::{run_transfer, TransferPlan, HOMING_TIMEOUT};
pub use valve::select_port;
