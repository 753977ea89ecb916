//! # amdsim Configuration
//!
//! Declarative inputs of the treat-and-extend simulator.
//!
//! ## Features
//! - **Protocol specification**: strict YAML documents validated into typed
//!   tables, with a SHA-256 checksum of the source bytes
//! - **Clinical improvements**: optional overlays configured per protocol
//! - **Run configuration**: defaults, `config/amdsim.yaml` and `AMDSIM_*`
//!   environment variables merged with figment

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod error;
pub mod improvements;
pub mod protocol;
pub mod run;
pub mod validation;

pub use error::ConfigError;
pub use improvements::{
    ClinicalImprovements, LoadingPhase, ResponseCategory, ResponseHeterogeneity,
    TimeBasedDiscontinuation,
};
pub use protocol::tables::{EffectMultipliers, TransitionMatrix, VisionChange, VisionChangeModel};
pub use protocol::{
    BaselineVision, DiscontinuationRules, ProtocolDocument, ProtocolParameters,
    ProtocolSpecification, Provenance, RetreatmentRules,
};
pub use run::{EngineType, RunConfig, RunParameters};
