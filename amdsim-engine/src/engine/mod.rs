//! Simulation drivers.
//!
//! Both engines enroll the same arrivals, give every patient its own random
//! stream and delegate each due date to [`VisitProcessor`]. They differ only
//! in how they find the next thing to do.

mod agent;
mod event;
mod processor;

use std::sync::Arc;

use amdsim_config::{EngineType, RunParameters};
use amdsim_core::rng::RngStreams;
use amdsim_core::SimulationError;
use amdsim_simulator::{Arrival, ClinicalModel, EnrollmentScheduler, EnrollmentSummary};
use serde_json::json;

use crate::audit::AuditLog;
use crate::results::SimulationResults;

pub use self::{
    agent::AgentEngine,
    event::EventEngine,
    processor::{PatientSlot, VisitProcessor},
};

pub trait SimulationEngine {
    fn engine_type(&self) -> EngineType;

    fn run(&mut self, audit: &mut AuditLog) -> Result<SimulationResults, SimulationError>;
}

/// Builds the engine selected by `params.engine`.
pub fn build_engine(
    model: Arc<ClinicalModel>,
    params: RunParameters,
) -> Box<dyn SimulationEngine + Send> {
    match params.engine {
        EngineType::Abs => Box::new(AgentEngine::new(model, params)),
        EngineType::Des => Box::new(EventEngine::new(model, params)),
    }
}

/// Generates the arrival sequence and records it in the audit trail.
fn enroll(
    params: &RunParameters,
    streams: &RngStreams,
    audit: &mut AuditLog,
) -> Result<Vec<Arrival>, SimulationError> {
    let scheduler = EnrollmentScheduler::new(
        params.start_date,
        params.n_patients,
        f64::from(params.horizon_days),
    );
    let arrivals = scheduler.schedule(&mut streams.enrollment())?;
    let summary = EnrollmentSummary::new(&scheduler, &arrivals);
    audit.record(
        "enrollment_generated",
        json!({
            "engine": params.engine,
            "target": summary.target,
            "generated": summary.generated,
            "rate_per_day": summary.rate_per_day,
            "first_arrival": summary.first_arrival,
            "last_arrival": summary.last_arrival,
        }),
    );
    Ok(arrivals)
}
