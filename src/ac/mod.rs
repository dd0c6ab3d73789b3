//! Air-conditioner status: domain types, the actuator seam and the shared store.

pub mod persistence;
pub mod simulation;
pub mod store;

pub use persistence::{AcStatusFile, PersistedAcStatus};
pub use simulation::SimulatedAcUnit;
pub use store::AcStatusStore;

use crate::error::{HomeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use strum::{EnumIter, EnumString, FromRepr};
use thiserror::Error;

/// Operating mode of the AC unit. Discriminants match the wire enum.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    FromRepr,
    strum::Display,
)]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AcMode {
    #[default]
    Auto = 0,
    Warm = 1,
    Dry = 2,
    Cool = 3,
    Fan = 4,
}

impl TryFrom<i32> for AcMode {
    type Error = HomeError;

    fn try_from(value: i32) -> Result<Self> {
        AcMode::from_repr(value).ok_or(HomeError::InvalidMode(value))
    }
}

/// Full status of the single AC unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcStatus {
    pub powered: bool,
    pub mode: AcMode,
    /// Target temperature in whole degrees Celsius
    pub temperature: u32,
}

impl Display for AcStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}°C",
            if self.powered { "on" } else { "off" },
            self.mode,
            self.temperature
        )
    }
}

/// Inclusive range of target temperatures the unit accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: u32,
    pub max: u32,
}

impl Default for TemperatureRange {
    /// 16–30 °C, the span of the Sanyo remote protocol.
    fn default() -> Self {
        Self { min: 16, max: 30 }
    }
}

impl Display for TemperatureRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

impl TemperatureRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Reject, never clamp, a temperature outside the range.
    pub fn check(&self, value: u32) -> Result<u32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(HomeError::InvalidTemperature { value, range: *self })
        }
    }
}

/// Hardware or driver failure while driving the AC unit.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ActuatorFault(String);

impl ActuatorFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Synchronous access to the AC unit.
pub trait AcActuator: Send + Sync {
    /// Drive the unit to `status` and report what it actually reached.
    fn apply(&self, status: &AcStatus) -> std::result::Result<AcStatus, ActuatorFault>;

    /// Current state of the unit, used to seed the store at startup.
    fn read(&self) -> std::result::Result<AcStatus, ActuatorFault>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_mode_wire_values() {
        let values: Vec<i32> = AcMode::iter().map(|m| m as i32).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
        assert_eq!(assert_ok!(AcMode::try_from(3)), AcMode::Cool);

        let err = assert_err!(AcMode::try_from(5));
        assert!(matches!(err, HomeError::InvalidMode(5)));
        assert_err!(AcMode::try_from(-1));
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(AcMode::Dry.to_string(), "dry");
        assert_eq!(assert_ok!(AcMode::from_str("COOL")), AcMode::Cool);
        assert_eq!(assert_ok!(AcMode::from_str("fan")), AcMode::Fan);
        assert_err!(AcMode::from_str("heat"));
    }

    #[test]
    fn test_default_status() {
        let status = AcStatus::default();
        assert!(!status.powered);
        assert_eq!(status.mode, AcMode::Auto);
        assert_eq!(status.temperature, 0);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let range = TemperatureRange::default();
        assert_eq!(assert_ok!(range.check(16)), 16);
        assert_eq!(assert_ok!(range.check(30)), 30);

        let err = assert_err!(range.check(31));
        assert!(matches!(err, HomeError::InvalidTemperature { value: 31, .. }));
        assert_err!(range.check(15));
        assert_err!(range.check(0));
    }

    #[test]
    fn test_status_display() {
        let status = AcStatus {
            powered: true,
            mode: AcMode::Cool,
            temperature: 22,
        };
        assert_eq!(status.to_string(), "on cool 22°C");
    }

    #[test]
    fn test_status_serde_uses_lowercase_mode() {
        let status = AcStatus {
            powered: false,
            mode: AcMode::Warm,
            temperature: 25,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"powered":false,"mode":"warm","temperature":25}"#);
    }
}
