//! In-memory AC unit for development and testing.

use super::{AcActuator, AcStatus, ActuatorFault};
use log::info;
use parking_lot::Mutex;

/// AC unit that accepts every status as-is and logs the transitions.
pub struct SimulatedAcUnit {
    state: Mutex<AcStatus>,
}

impl SimulatedAcUnit {
    pub fn new(initial: AcStatus) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }
}

impl AcActuator for SimulatedAcUnit {
    fn apply(&self, status: &AcStatus) -> Result<AcStatus, ActuatorFault> {
        let mut state = self.state.lock();
        if state.powered != status.powered {
            info!(
                "[Sim] AC powered {}",
                if status.powered { "on" } else { "off" }
            );
        }
        if state.mode != status.mode {
            info!("[Sim] AC mode {} -> {}", state.mode, status.mode);
        }
        if state.temperature != status.temperature {
            info!(
                "[Sim] AC temperature {} -> {}°C",
                state.temperature, status.temperature
            );
        }
        *state = *status;
        Ok(*state)
    }

    fn read(&self) -> Result<AcStatus, ActuatorFault> {
        Ok(*self.state.lock())
    }
}
