use amdsim_config::ConfigError;
use amdsim_core::{InvariantViolation, ParameterError, SimulationError};
use thiserror::Error;

/// Failure of a simulation request, from protocol wiring through the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

impl From<ParameterError> for EngineError {
    fn from(err: ParameterError) -> Self {
        EngineError::Simulation(err.into())
    }
}

impl From<InvariantViolation> for EngineError {
    fn from(err: InvariantViolation) -> Self {
        EngineError::Simulation(err.into())
    }
}
