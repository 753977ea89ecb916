use chrono::NaiveDate;
use thiserror::Error;

use crate::patient::PatientId;

/// Invalid run parameters, raised before any engine is constructed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Patient count must not be negative (got {0})")]
    NegativePatientCount(i64),

    #[error("Patient count {0} exceeds the supported maximum of {max}", max = u32::MAX)]
    PatientCountOutOfRange(i64),

    #[error("Duration must be a positive number of years (got {0})")]
    NonPositiveDuration(f64),

    #[error("Unknown engine type '{0}' (expected 'abs' or 'des')")]
    UnknownEngine(String),

    #[error("Simulation horizon of {0} days is out of range")]
    HorizonOutOfRange(i64),
}

/// An internal invariant broken while a run was in progress.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Invariant violated for patient {patient} on {date}: {detail}")]
pub struct InvariantViolation {
    pub patient: PatientId,
    pub date: NaiveDate,
    pub detail: String,
}

impl InvariantViolation {
    pub fn new(patient: PatientId, date: NaiveDate, detail: impl Into<String>) -> Self {
        Self {
            patient,
            date,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid run parameter: {0}")]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("Sampling failed: {0}")]
    Sampling(String),
}
