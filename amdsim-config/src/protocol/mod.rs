//! Validated treat-and-extend protocol specification.
//!
//! A [`ProtocolSpecification`] is built once from a YAML document and never
//! mutated afterwards. Runs share it read-only behind an `Arc`.

pub mod document;
pub mod tables;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use validator::Validate;

use crate::improvements::ClinicalImprovements;
use crate::ConfigError;
pub use document::{
    BaselineVisionDocument, DiscontinuationRulesDocument, ProtocolDocument, RetreatmentDocument,
};
use tables::{EffectMultipliers, TableError, TransitionMatrix, VisionChangeModel};

/// Baseline vision distribution, clamped to `[min, max]` when sampled.
pub type BaselineVision = BaselineVisionDocument;
/// Stopping-rule thresholds and probabilities.
pub type DiscontinuationRules = DiscontinuationRulesDocument;
/// Retreatment parameters for discontinued patients.
pub type RetreatmentRules = RetreatmentDocument;

/// Typed protocol parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolParameters {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub protocol_type: String,
    pub min_interval_days: u32,
    pub max_interval_days: u32,
    pub extension_days: u32,
    pub shortening_days: u32,
    pub treat_when_stable: bool,
    pub disease_transitions: TransitionMatrix,
    pub treatment_effect_on_transitions: EffectMultipliers,
    pub vision_change_model: VisionChangeModel,
    pub baseline_vision: BaselineVision,
    pub discontinuation_rules: DiscontinuationRules,
    pub retreatment: RetreatmentRules,
    pub clinical_improvements: ClinicalImprovements,
}

/// Where a specification came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Hex SHA-256 of the source bytes.
    pub checksum: String,
    pub loaded_at: DateTime<Utc>,
    pub source: Option<PathBuf>,
}

impl Provenance {
    fn new(bytes: &[u8], source: Option<PathBuf>) -> Self {
        Self {
            checksum: hex::encode(Sha256::digest(bytes)),
            loaded_at: Utc::now(),
            source,
        }
    }

    /// Load timestamp in RFC 3339 form.
    pub fn loaded_at_rfc3339(&self) -> String {
        self.loaded_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[derive(Debug, Clone)]
pub struct ProtocolSpecification {
    parameters: ProtocolParameters,
    provenance: Provenance,
}

impl ProtocolSpecification {
    /// Load and validate a protocol document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let document: ProtocolDocument = serde_yaml::from_slice(&bytes)?;
        let spec = Self::from_document(document, Provenance::new(&bytes, Some(path.into())))?;
        info!(
            protocol = %spec.parameters.name,
            version = %spec.parameters.version,
            checksum = %spec.provenance.checksum,
            path = %path.display(),
            "Protocol loaded"
        );
        Ok(spec)
    }

    /// Load and validate a protocol document held in memory.
    pub fn load_str(text: &str, source: Option<PathBuf>) -> Result<Self, ConfigError> {
        let document: ProtocolDocument = serde_yaml::from_str(text)?;
        Self::from_document(document, Provenance::new(text.as_bytes(), source))
    }

    /// Validate a parsed document and attach provenance.
    pub fn from_document(
        document: ProtocolDocument,
        provenance: Provenance,
    ) -> Result<Self, ConfigError> {
        document.validate()?;
        check_consistency(&document)?;

        let disease_transitions = TransitionMatrix::from_table(&document.disease_transitions)
            .map_err(invalid_transitions)?;
        let treatment_effect_on_transitions =
            EffectMultipliers::from_table(&document.treatment_effect_on_transitions)
                .map_err(invalid_transitions)?;
        let vision_change_model = VisionChangeModel::from_scenarios(&document.vision_change_model)
            .map_err(|err| ConfigError::Inconsistent(err.to_string()))?;
        let clinical_improvements = match &document.clinical_improvements {
            Some(overlays) => ClinicalImprovements::from_document(
                overlays,
                (document.min_interval_days, document.max_interval_days),
            )?,
            None => ClinicalImprovements::none(),
        };

        debug!(
            protocol = %document.name,
            min_interval = document.min_interval_days,
            max_interval = document.max_interval_days,
            extension = document.extension_days,
            shortening = document.shortening_days,
            overlays = ?clinical_improvements.enabled_names(),
            "Protocol validated"
        );

        let parameters = ProtocolParameters {
            name: document.name,
            version: document.version,
            author: document.author,
            description: document.description,
            protocol_type: document.protocol_type,
            min_interval_days: document.min_interval_days,
            max_interval_days: document.max_interval_days,
            extension_days: document.extension_days,
            shortening_days: document.shortening_days,
            treat_when_stable: document.treat_when_stable,
            disease_transitions,
            treatment_effect_on_transitions,
            vision_change_model,
            baseline_vision: document.baseline_vision,
            discontinuation_rules: document.discontinuation_rules,
            retreatment: document.retreatment,
            clinical_improvements,
        };
        Ok(Self {
            parameters,
            provenance,
        })
    }

    /// Declarative form of this specification.
    pub fn to_document(&self) -> ProtocolDocument {
        let p = &self.parameters;
        ProtocolDocument {
            name: p.name.clone(),
            version: p.version.clone(),
            author: p.author.clone(),
            description: p.description.clone(),
            protocol_type: p.protocol_type.clone(),
            min_interval_days: p.min_interval_days,
            max_interval_days: p.max_interval_days,
            extension_days: p.extension_days,
            shortening_days: p.shortening_days,
            treat_when_stable: p.treat_when_stable,
            disease_transitions: p.disease_transitions.to_table(),
            treatment_effect_on_transitions: p.treatment_effect_on_transitions.to_table(),
            vision_change_model: p.vision_change_model.to_scenarios(),
            baseline_vision: p.baseline_vision,
            discontinuation_rules: p.discontinuation_rules,
            retreatment: p.retreatment,
            clinical_improvements: p.clinical_improvements.to_document(),
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(&self.to_document())?)
    }

    /// Write the declarative form to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_yaml()?)?;
        info!(path = %path.display(), protocol = %self.parameters.name, "Protocol saved");
        Ok(())
    }

    /// True when both specifications carry the same parameter values,
    /// regardless of provenance.
    pub fn parameters_eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters
    }

    pub fn parameters(&self) -> &ProtocolParameters {
        &self.parameters
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn checksum(&self) -> &str {
        &self.provenance.checksum
    }

    pub fn name(&self) -> &str {
        &self.parameters.name
    }

    pub fn version(&self) -> &str {
        &self.parameters.version
    }

    /// Inclusive interval bounds in days.
    pub fn interval_bounds(&self) -> std::ops::RangeInclusive<u32> {
        self.parameters.min_interval_days..=self.parameters.max_interval_days
    }

    pub fn clinical_improvements(&self) -> &ClinicalImprovements {
        &self.parameters.clinical_improvements
    }
}

fn invalid_transitions(err: TableError) -> ConfigError {
    ConfigError::InvalidTransitions(err.to_string())
}

fn check_consistency(document: &ProtocolDocument) -> Result<(), ConfigError> {
    if document.min_interval_days > document.max_interval_days {
        return Err(ConfigError::Inconsistent(format!(
            "min_interval_days {} exceeds max_interval_days {}",
            document.min_interval_days, document.max_interval_days
        )));
    }
    let baseline = &document.baseline_vision;
    if baseline.min > baseline.max {
        return Err(ConfigError::Inconsistent(format!(
            "baseline_vision.min {} exceeds baseline_vision.max {}",
            baseline.min, baseline.max
        )));
    }
    let rules = &document.discontinuation_rules;
    let floats = [
        ("baseline_vision.mean", baseline.mean),
        ("baseline_vision.std", baseline.std),
        ("baseline_vision.min", baseline.min),
        ("baseline_vision.max", baseline.max),
        ("discontinuation_rules.poor_vision_threshold", rules.poor_vision_threshold),
        ("discontinuation_rules.poor_vision_probability", rules.poor_vision_probability),
        ("discontinuation_rules.high_injection_probability", rules.high_injection_probability),
        ("discontinuation_rules.long_treatment_months", rules.long_treatment_months),
        ("discontinuation_rules.long_treatment_probability", rules.long_treatment_probability),
        ("retreatment.probability", document.retreatment.probability),
    ];
    if let Some((field, value)) = floats.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ConfigError::Inconsistent(format!(
            "{field} must be finite, got {value}"
        )));
    }
    Ok(())
}

impl std::fmt::Display for ProtocolSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} v{} ({})",
            self.parameters.name,
            self.parameters.version,
            &self.provenance.checksum[..self.provenance.checksum.len().min(12)]
        )
    }
}
