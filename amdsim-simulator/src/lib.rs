//! # amdsim Simulator
//!
//! Outcome-generating components of the treat-and-extend simulation. Each
//! component is built from a validated [`ProtocolSpecification`] and draws
//! from a caller-supplied random stream, so the engines decide which stream
//! a decision consumes.
//!
//! ## Key Components:
//! - **DiseaseModel:** Markov progression between disease states.
//! - **VisionModel:** Normal vision change per visit scenario.
//! - **TreatmentProtocol:** Treatment decision and interval state machine.
//! - **EnrollmentScheduler:** Poisson arrival process.
//! - **DiscontinuationPolicy:** Stopping and retreatment rules.
//! - **PatientFactory:** Baseline vision and responder category at arrival.

use amdsim_config::{ConfigError, ProtocolSpecification};

pub mod discontinuation;
pub mod disease;
pub mod enrollment;
pub mod factory;
pub mod protocol;
pub mod vision;

pub use discontinuation::DiscontinuationPolicy;
pub use disease::DiseaseModel;
pub use enrollment::{Arrival, EnrollmentScheduler, EnrollmentSummary};
pub use factory::PatientFactory;
pub use protocol::TreatmentProtocol;
pub use vision::VisionModel;

/// Every component a run needs, built from one specification.
#[derive(Debug, Clone)]
pub struct ClinicalModel {
    pub disease: DiseaseModel,
    pub vision: VisionModel,
    pub protocol: TreatmentProtocol,
    pub discontinuation: DiscontinuationPolicy,
    pub factory: PatientFactory,
}

impl ClinicalModel {
    pub fn from_spec(spec: &ProtocolSpecification) -> Result<Self, ConfigError> {
        Ok(Self {
            disease: DiseaseModel::from_spec(spec)?,
            vision: VisionModel::from_spec(spec)?,
            protocol: TreatmentProtocol::from_spec(spec),
            discontinuation: DiscontinuationPolicy::from_spec(spec),
            factory: PatientFactory::from_spec(spec)?,
        })
    }
}
