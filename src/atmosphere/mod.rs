//! Atmosphere sensing: feature masks, readings and the streaming engine.
//!
//! Sensors sit behind the synchronous [`AtmosphereSensor`] trait. The
//! [`AtmosphereEngine`] drives one session task per stream client and polls
//! the sensor for exactly the features that client selected.

pub mod engine;
pub mod session;
pub mod simulation;

pub use engine::{AtmosphereEngine, EngineSettings};
pub use session::{MaskUpdate, SessionState};
pub use simulation::SimulatedAtmosphere;

use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Which atmosphere fields a client wants reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeatureMask {
    pub temperature: bool,
    pub pressure: bool,
    pub humidity: bool,
    pub altitude: bool,
}

impl FeatureMask {
    /// Every feature selected.
    pub const ALL: FeatureMask = FeatureMask {
        temperature: true,
        pressure: true,
        humidity: true,
        altitude: true,
    };

    pub fn is_empty(&self) -> bool {
        !(self.temperature || self.pressure || self.humidity || self.altitude)
    }

    /// Drop any field of `reading` this mask does not select.
    pub fn apply(&self, reading: Reading) -> Reading {
        Reading {
            temperature: reading.temperature.filter(|_| self.temperature),
            pressure: reading.pressure.filter(|_| self.pressure),
            humidity: reading.humidity.filter(|_| self.humidity),
            altitude: reading.altitude.filter(|_| self.altitude),
        }
    }
}

impl Display for FeatureMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.temperature, "temperature"),
            (self.pressure, "pressure"),
            (self.humidity, "humidity"),
            (self.altitude, "altitude"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
        if names.is_empty() {
            write!(f, "[]")
        } else {
            write!(f, "[{}]", names.join(", "))
        }
    }
}

/// One sample from the sensor. `None` means the field was not requested.
///
/// Units: temperature °C, pressure hPa, humidity %RH, altitude m.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub temperature: Option<f32>,
    pub pressure: Option<f32>,
    pub humidity: Option<f32>,
    pub altitude: Option<f32>,
}

impl Reading {
    pub fn empty() -> Reading {
        Reading::default()
    }

    /// Mask describing which fields carry a value.
    pub fn populated(&self) -> FeatureMask {
        FeatureMask {
            temperature: self.temperature.is_some(),
            pressure: self.pressure.is_some(),
            humidity: self.humidity.is_some(),
            altitude: self.altitude.is_some(),
        }
    }
}

impl Display for Reading {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = [
            ("temperature", self.temperature),
            ("pressure", self.pressure),
            ("humidity", self.humidity),
            ("altitude", self.altitude),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| format!("{name}: {v:.2}")))
        .collect();
        write!(f, "{{ {} }}", fields.join(", "))
    }
}

/// Hardware or driver failure while sampling the atmosphere.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SensorFault(String);

impl SensorFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The client's inbound stream broke before it finished.
///
/// Not an error for the client: its session just ends.
#[derive(Debug, Clone, Error)]
#[error("connection lost: {0}")]
pub struct ConnectionLost(String);

impl ConnectionLost {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Synchronous access to the atmosphere sensor group.
///
/// Implementations are shared by every stream session, so `read` may be
/// called from several blocking threads at once and must guard its own
/// state. Only the fields selected in `features` may be sampled and reported.
/// It is never called with an empty mask.
pub trait AtmosphereSensor: Send + Sync {
    fn read(&self, features: FeatureMask) -> Result<Reading, SensorFault>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_is_empty() {
        assert!(FeatureMask::default().is_empty());
        assert!(!FeatureMask::ALL.is_empty());
        let only_altitude = FeatureMask {
            altitude: true,
            ..FeatureMask::default()
        };
        assert!(!only_altitude.is_empty());
    }

    #[test]
    fn test_mask_apply_drops_unselected_fields() {
        let full = Reading {
            temperature: Some(21.0),
            pressure: Some(1000.0),
            humidity: Some(40.0),
            altitude: Some(110.0),
        };
        let mask = FeatureMask {
            temperature: true,
            humidity: true,
            ..FeatureMask::default()
        };
        let masked = mask.apply(full);
        assert_eq!(masked.temperature, Some(21.0));
        assert_eq!(masked.pressure, None);
        assert_eq!(masked.humidity, Some(40.0));
        assert_eq!(masked.altitude, None);
        assert_eq!(masked.populated(), mask);
    }

    #[test]
    fn test_display() {
        let mask = FeatureMask {
            pressure: true,
            altitude: true,
            ..FeatureMask::default()
        };
        assert_eq!(mask.to_string(), "[pressure, altitude]");
        assert_eq!(FeatureMask::default().to_string(), "[]");

        let reading = Reading {
            temperature: Some(21.5),
            ..Reading::empty()
        };
        assert_eq!(reading.to_string(), "{ temperature: 21.50 }");
    }
}
