//! Declarative protocol document.
//!
//! Every field is required: a missing key fails deserialization and unknown
//! keys are rejected. The only optional section is `clinical_improvements`,
//! whose absence means no overlay is active.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::tables::{StateTable, VisionChange};
use crate::improvements::ClinicalImprovementsDocument;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProtocolDocument {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub version: String,
    pub author: String,
    pub description: String,

    /// Protocol family; only `treat_and_extend` is simulated.
    #[validate(custom(function = validation::validate_protocol_type))]
    pub protocol_type: String,

    #[validate(range(min = 1, max = 3650))]
    pub min_interval_days: u32,
    #[validate(range(min = 1, max = 3650))]
    pub max_interval_days: u32,
    #[validate(range(min = 1, max = 3650))]
    pub extension_days: u32,
    #[validate(range(min = 1, max = 3650))]
    pub shortening_days: u32,

    /// De-escalation rule: whether stable (or still naive) follow-up visits are injected.
    pub treat_when_stable: bool,

    #[validate(custom(function = validation::validate_transition_rows))]
    pub disease_transitions: StateTable,

    #[validate(custom(function = validation::validate_multiplier_rows))]
    pub treatment_effect_on_transitions: StateTable,

    #[validate(custom(function = validation::validate_vision_scenarios))]
    pub vision_change_model: BTreeMap<String, VisionChange>,

    #[validate(nested)]
    pub baseline_vision: BaselineVisionDocument,

    #[validate(nested)]
    pub discontinuation_rules: DiscontinuationRulesDocument,

    #[validate(nested)]
    pub retreatment: RetreatmentDocument,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_improvements: Option<ClinicalImprovementsDocument>,
}

/// Distribution of visual acuity at enrollment (ETDRS letters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BaselineVisionDocument {
    #[validate(range(min = 0.0, max = 100.0))]
    pub mean: f64,
    #[validate(range(min = 0.0))]
    pub std: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub min: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max: f64,
}

/// Thresholds and per-visit probabilities of the stopping rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DiscontinuationRulesDocument {
    #[validate(range(min = 0.0, max = 100.0))]
    pub poor_vision_threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub poor_vision_probability: f64,
    pub high_injection_count: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub high_injection_probability: f64,
    #[validate(range(min = 0.0))]
    pub long_treatment_months: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub long_treatment_probability: f64,
}

/// How discontinued patients are monitored and brought back to treatment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RetreatmentDocument {
    #[validate(range(min = 0.0, max = 1.0))]
    pub probability: f64,
    #[validate(range(min = 1, max = 3650))]
    pub monitoring_interval_days: u32,
    /// Restart the injection count and duration used by the stopping rules.
    pub reset_course_on_retreatment: bool,
}
