//! # amdsim Engine
//!
//! Agent-based and discrete-event drivers for the treat-and-extend
//! simulation, the results they produce and the runner that wires a
//! protocol specification into them.

pub mod audit;
pub mod engine;
mod error;
pub mod results;
pub mod runner;

pub use audit::{AuditEntry, AuditLog};
pub use engine::{build_engine, AgentEngine, EventEngine, SimulationEngine, VisitProcessor};
pub use error::EngineError;
pub use results::{PatientBatches, ResultsSummary, SimulationResults};
pub use runner::SimulationRunner;

pub mod prelude {
    pub use super::{
        AuditLog, EngineError, SimulationEngine, SimulationResults, SimulationRunner,
    };
    pub use amdsim_config::{EngineType, ProtocolSpecification, RunParameters};
}
