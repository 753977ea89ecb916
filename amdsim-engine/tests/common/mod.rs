#![allow(dead_code)]

use std::sync::Arc;

use amdsim_config::{ProtocolDocument, ProtocolSpecification};
use amdsim_engine::SimulationRunner;

pub const SAMPLE: &str = include_str!("../../../protocols/treat_and_extend.yaml");

pub fn sample_document() -> ProtocolDocument {
    serde_yaml::from_str(SAMPLE).expect("sample protocol parses")
}

pub fn spec(document: &ProtocolDocument) -> Arc<ProtocolSpecification> {
    let text = serde_yaml::to_string(document).expect("document serializes");
    Arc::new(ProtocolSpecification::load_str(&text, None).expect("protocol is valid"))
}

pub fn runner(document: &ProtocolDocument) -> SimulationRunner {
    SimulationRunner::new(spec(document)).expect("runner builds")
}

/// Stopping rules that never fire.
pub fn without_discontinuation(document: &mut ProtocolDocument) {
    let rules = &mut document.discontinuation_rules;
    rules.poor_vision_probability = 0.0;
    rules.high_injection_probability = 0.0;
    rules.long_treatment_probability = 0.0;
    document.clinical_improvements = None;
}

/// Treated transitions always land in STABLE.
pub fn stable_when_treated(document: &mut ProtocolDocument) {
    for row in document.treatment_effect_on_transitions.values_mut() {
        for (to, multiplier) in row.iter_mut() {
            *multiplier = if to == "STABLE" { 1.0 } else { 0.0 };
        }
    }
}
