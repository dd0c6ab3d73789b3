//! Simulated atmosphere sensor for development and testing.
//!
//! Values drift in a bounded random walk around typical indoor conditions so
//! that stream clients see plausible, changing readings without hardware.

use super::{AtmosphereSensor, FeatureMask, Reading, SensorFault};
use log::trace;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASE_TEMPERATURE: f32 = 22.0;
const BASE_PRESSURE: f32 = 1005.0;
const BASE_HUMIDITY: f32 = 45.0;

const TEMPERATURE_SPAN: f32 = 4.0;
const PRESSURE_SPAN: f32 = 15.0;
const HUMIDITY_SPAN: f32 = 15.0;

/// Altitude in metres above the reference pressure level.
pub fn altitude_from_pressure(pressure: f32, sea_level_pressure: f32) -> f32 {
    44330.0 * (1.0 - (pressure / sea_level_pressure).powf(0.1903))
}

struct Drift {
    rng: StdRng,
    temperature: f32,
    pressure: f32,
    humidity: f32,
}

impl Drift {
    fn step(rng: &mut StdRng, value: f32, base: f32, span: f32, max_step: f32) -> f32 {
        let next = value + rng.gen_range(-max_step..=max_step);
        next.clamp(base - span, base + span)
    }
}

/// Random-walk atmosphere sensor.
///
/// Only requested fields are advanced and reported. Altitude is derived from
/// pressure, so an altitude request samples pressure internally.
pub struct SimulatedAtmosphere {
    state: Mutex<Drift>,
    sea_level_pressure: f32,
}

impl SimulatedAtmosphere {
    pub fn new(sea_level_pressure: f32) -> Self {
        Self::with_rng(StdRng::from_entropy(), sea_level_pressure)
    }

    /// Deterministic sensor for tests.
    pub fn seeded(seed: u64, sea_level_pressure: f32) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), sea_level_pressure)
    }

    fn with_rng(rng: StdRng, sea_level_pressure: f32) -> Self {
        Self {
            state: Mutex::new(Drift {
                rng,
                temperature: BASE_TEMPERATURE,
                pressure: BASE_PRESSURE,
                humidity: BASE_HUMIDITY,
            }),
            sea_level_pressure,
        }
    }
}

impl AtmosphereSensor for SimulatedAtmosphere {
    fn read(&self, features: FeatureMask) -> Result<Reading, SensorFault> {
        if !self.sea_level_pressure.is_finite() || self.sea_level_pressure <= 0.0 {
            return Err(SensorFault::new(format!(
                "invalid sea level pressure {}",
                self.sea_level_pressure
            )));
        }

        let mut guard = self.state.lock();
        let drift = &mut *guard;
        let mut reading = Reading::empty();

        if features.temperature {
            drift.temperature = Drift::step(
                &mut drift.rng,
                drift.temperature,
                BASE_TEMPERATURE,
                TEMPERATURE_SPAN,
                0.1,
            );
            reading.temperature = Some(drift.temperature);
        }

        if features.pressure || features.altitude {
            drift.pressure = Drift::step(
                &mut drift.rng,
                drift.pressure,
                BASE_PRESSURE,
                PRESSURE_SPAN,
                0.3,
            );
            reading.pressure = features.pressure.then_some(drift.pressure);
            reading.altitude = features
                .altitude
                .then(|| altitude_from_pressure(drift.pressure, self.sea_level_pressure));
        }

        if features.humidity {
            drift.humidity = Drift::step(
                &mut drift.rng,
                drift.humidity,
                BASE_HUMIDITY,
                HUMIDITY_SPAN,
                0.5,
            );
            reading.humidity = Some(drift.humidity.clamp(0.0, 100.0));
        }

        trace!("[Sim] atmosphere {} -> {}", features, reading);
        Ok(reading)
    }
}
