use crate::ac::{ActuatorFault, TemperatureRange};
use crate::atmosphere::SensorFault;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum HomeError {
    #[error("Temperature {value} outside supported range {range}")]
    InvalidTemperature { value: u32, range: TemperatureRange },

    #[error("Unknown AC mode value: {0}")]
    InvalidMode(i32),

    #[error("Atmosphere stream used before any feature mask was received")]
    Unconfigured,

    #[error("Atmosphere sensor fault: {0}")]
    Sensor(#[from] SensorFault),

    #[error("AC actuator fault: {0}")]
    Actuator(#[from] ActuatorFault),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl HomeError {
    /// True for failures caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HomeError::InvalidTemperature { .. }
                | HomeError::InvalidMode(_)
                | HomeError::Unconfigured
        )
    }
}

impl From<HomeError> for tonic::Status {
    fn from(err: HomeError) -> Self {
        let message = err.to_string();
        match err {
            HomeError::InvalidTemperature { .. } | HomeError::InvalidMode(_) => {
                tonic::Status::invalid_argument(message)
            }
            HomeError::Unconfigured => tonic::Status::failed_precondition(message),
            HomeError::Sensor(_)
            | HomeError::Actuator(_)
            | HomeError::IoError(_)
            | HomeError::SerdeJsonError(_) => tonic::Status::internal(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, HomeError>;
