//! # amdsim-core
//!
//! Domain layer shared by every part of the treat-and-extend simulator.
//!
//! ### Key Submodules:
//! - `disease`: the four-state disease classification
//! - `patient`: per-patient record, visit history and lifecycle transitions
//! - `events`: scheduled-event queue used by the event-stepped engine
//! - `time`: day-resolution simulation clock
//! - `rng`: deterministic random streams derived from a run seed
//! - `error`: parameter and invariant errors

pub mod disease;
pub mod error;
pub mod events;
pub mod patient;
pub mod rng;
pub mod time;

pub mod prelude {
    pub use crate::disease::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::patient::*;
    pub use crate::rng::*;
    pub use crate::time::*;
}

pub use disease::DiseaseState;
pub use error::{InvariantViolation, ParameterError, SimulationError};
pub use patient::{
    DiscontinuationRecord, DiscontinuationType, Patient, PatientId, PatientStatus,
    RetreatmentRecord, Visit,
};
