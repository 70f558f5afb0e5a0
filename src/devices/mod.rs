//! Built-in instrument vocabularies.
//!
//! Each submodule is configuration over [`crate::instrument`]: a connection
//! profile, a command table, reply predicates, and thin typed wrappers that
//! validate arguments before they reach the wire.
//!
//! | Module      | Instrument                     | Framing | Command end | Reply end |
//! |-------------|--------------------------------|---------|-------------|-----------|
//! | [`aladdin`] | WPI Aladdin syringe pump       | 8N1     | `\r`        | ETX       |
//! | [`vici`]    | VICI multiposition actuator    | 8N1     | `\r`        | `\r`      |
//! | [`ika`]     | IKA plates (NAMUR)             | 7E1     | `\r\n`      | `\n`      |

pub mod aladdin;
pub mod ika;
pub mod vici;

use crate::error::{DeviceError, DeviceResult};

/// Reject `value` outside `min..=max` before anything is sent.
pub(crate) fn check_range<T>(what: &str, value: T, min: T, max: T) -> DeviceResult<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(DeviceError::InvalidArgument(format!(
            "{} {} out of range ({}-{})",
            what, value, min, max
        )));
    }
    Ok(())
}
