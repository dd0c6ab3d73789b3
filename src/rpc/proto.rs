//! `mattori_home` wire messages.
//!
//! Field numbers and types are fixed by the published schema; existing
//! clients depend on them.

use crate::ac::{self, AcMode};
use crate::atmosphere::{FeatureMask, Reading};
use crate::error::{HomeError, Result};

/// Features a stream client wants reported.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct AtmosphereFeatures {
    #[prost(bool, tag = "1")]
    pub temperature: bool,
    #[prost(bool, tag = "2")]
    pub pressure: bool,
    #[prost(bool, tag = "3")]
    pub humidity: bool,
    #[prost(bool, tag = "4")]
    pub altitude: bool,
}

/// One streamed reading. Unrequested fields are 0.0.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct AtmosphereReading {
    #[prost(float, tag = "1")]
    pub temperature: f32,
    #[prost(float, tag = "2")]
    pub pressure: f32,
    #[prost(float, tag = "3")]
    pub humidity: f32,
    #[prost(float, tag = "4")]
    pub altitude: f32,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct AcStatusParam {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct AcStatus {
    #[prost(bool, tag = "1")]
    pub powered: bool,
    #[prost(enumeration = "ac_status::Mode", tag = "2")]
    pub mode: i32,
    #[prost(uint32, tag = "3")]
    pub temperature: u32,
}

pub mod ac_status {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum Mode {
        Auto = 0,
        Warm = 1,
        Dry = 2,
        Cool = 3,
        Fan = 4,
    }
}

include!(concat!(env!("OUT_DIR"), "/mattori_home.Home.rs"));

impl From<AtmosphereFeatures> for FeatureMask {
    fn from(features: AtmosphereFeatures) -> Self {
        FeatureMask {
            temperature: features.temperature,
            pressure: features.pressure,
            humidity: features.humidity,
            altitude: features.altitude,
        }
    }
}

impl From<FeatureMask> for AtmosphereFeatures {
    fn from(mask: FeatureMask) -> Self {
        AtmosphereFeatures {
            temperature: mask.temperature,
            pressure: mask.pressure,
            humidity: mask.humidity,
            altitude: mask.altitude,
        }
    }
}

impl From<Reading> for AtmosphereReading {
    fn from(reading: Reading) -> Self {
        AtmosphereReading {
            temperature: reading.temperature.unwrap_or(0.0),
            pressure: reading.pressure.unwrap_or(0.0),
            humidity: reading.humidity.unwrap_or(0.0),
            altitude: reading.altitude.unwrap_or(0.0),
        }
    }
}

impl From<ac::AcStatus> for AcStatus {
    fn from(status: ac::AcStatus) -> Self {
        AcStatus {
            powered: status.powered,
            mode: status.mode as i32,
            temperature: status.temperature,
        }
    }
}

impl TryFrom<AcStatus> for ac::AcStatus {
    type Error = HomeError;

    /// Unknown mode numbers are rejected rather than mapped to a default.
    fn try_from(status: AcStatus) -> Result<Self> {
        Ok(ac::AcStatus {
            powered: status.powered,
            mode: AcMode::try_from(status.mode)?,
            temperature: status.temperature,
        })
    }
}
