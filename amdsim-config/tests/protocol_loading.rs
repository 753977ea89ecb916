use amdsim_config::{ConfigError, ProtocolDocument, ProtocolSpecification};
use amdsim_core::DiseaseState;
use proptest::prelude::*;

const SAMPLE: &str = include_str!("../../protocols/treat_and_extend.yaml");

fn sample_document() -> ProtocolDocument {
    serde_yaml::from_str(SAMPLE).expect("sample protocol parses")
}

fn load(document: &ProtocolDocument) -> Result<ProtocolSpecification, ConfigError> {
    let text = serde_yaml::to_string(document).expect("document serializes");
    ProtocolSpecification::load_str(&text, None)
}

#[test]
fn sample_protocol_loads() {
    let spec = ProtocolSpecification::load_str(SAMPLE, None).expect("sample protocol is valid");
    let params = spec.parameters();

    assert_eq!(params.name, "Standard Treat and Extend");
    assert_eq!(spec.interval_bounds(), 28..=112);
    assert_eq!(spec.checksum().len(), 64);
    assert!(spec.checksum().chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(
        params
            .disease_transitions
            .probability(DiseaseState::Stable, DiseaseState::Active),
        0.12
    );
    assert_eq!(
        params
            .vision_change_model
            .get(DiseaseState::HighlyActive, false)
            .mean,
        -5.0
    );
    assert_eq!(
        spec.clinical_improvements().enabled_names(),
        vec!["loading_phase", "response_heterogeneity"]
    );
}

#[test]
fn checksum_tracks_source_bytes() {
    let a = ProtocolSpecification::load_str(SAMPLE, None).unwrap();
    let b = ProtocolSpecification::load_str(SAMPLE, None).unwrap();
    let c = ProtocolSpecification::load_str(&format!("{SAMPLE}\n# trailing comment\n"), None)
        .unwrap();
    assert_eq!(a.checksum(), b.checksum());
    assert_ne!(a.checksum(), c.checksum());
    assert!(a.parameters_eq(&c));
}

#[test]
fn save_then_load_preserves_parameters() {
    let dir = std::env::temp_dir().join(format!("amdsim-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("round_trip.yaml");

    let original = ProtocolSpecification::load_str(SAMPLE, None).unwrap();
    original.save(&path).unwrap();
    let reloaded = ProtocolSpecification::load(&path).unwrap();

    assert!(original.parameters_eq(&reloaded));
    assert_eq!(reloaded.provenance().source.as_deref(), Some(path.as_path()));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_file_is_reported() {
    let err = ProtocolSpecification::load("does/not/exist.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn missing_required_field_is_rejected() {
    let text = SAMPLE.replace("shortening_days: 14\n", "");
    let err = ProtocolSpecification::load_str(&text, None).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
    assert!(err.to_string().contains("shortening_days"));
}

#[test]
fn unknown_field_is_rejected() {
    let text = format!("{SAMPLE}\nrandom_seed: 3\n");
    assert!(matches!(
        ProtocolSpecification::load_str(&text, None),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
fn row_not_summing_to_one_is_rejected() {
    let mut doc = sample_document();
    doc.disease_transitions
        .get_mut("STABLE")
        .unwrap()
        .insert("ACTIVE".into(), 0.2);
    let err = load(&doc).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("disease_transitions"));
}

#[test]
fn negative_probability_is_rejected() {
    let mut doc = sample_document();
    let row = doc.disease_transitions.get_mut("ACTIVE").unwrap();
    row.insert("NAIVE".into(), -0.1);
    row.insert("STABLE".into(), 0.42);
    assert!(load(&doc).is_err());
}

#[test]
fn missing_vision_scenario_is_rejected() {
    let mut doc = sample_document();
    doc.vision_change_model.remove("stable_untreated");
    let err = load(&doc).unwrap_err();
    assert!(err.to_string().contains("stable_untreated"));
}

#[test]
fn negative_vision_std_is_rejected() {
    let mut doc = sample_document();
    doc.vision_change_model
        .get_mut("active_treated")
        .unwrap()
        .std = -1.0;
    assert!(load(&doc).is_err());
}

#[test]
fn inverted_interval_bounds_are_rejected() {
    let mut doc = sample_document();
    doc.min_interval_days = 120;
    assert!(matches!(load(&doc), Err(ConfigError::Inconsistent(_))));
}

#[test]
fn unsupported_protocol_type_is_rejected() {
    let mut doc = sample_document();
    doc.protocol_type = "fixed_interval".into();
    assert!(matches!(load(&doc), Err(ConfigError::Validation(_))));
}

#[test]
fn out_of_range_probability_is_rejected() {
    let mut doc = sample_document();
    doc.retreatment.probability = 1.5;
    let err = load(&doc).unwrap_err();
    assert!(err.to_string().contains("retreatment.probability"));
}

#[test]
fn protocol_without_overlays_is_valid() {
    let mut doc = sample_document();
    doc.clinical_improvements = None;
    let spec = load(&doc).unwrap();
    assert!(!spec.clinical_improvements().any_enabled());
}

proptest! {
    #[test]
    fn perturbed_rows_are_accepted_only_within_tolerance(delta in -0.01f64..0.01) {
        let mut doc = sample_document();
        let row = doc.disease_transitions.get_mut("HIGHLY_ACTIVE").unwrap();
        row.insert("HIGHLY_ACTIVE".into(), 0.58 + delta);
        let result = load(&doc);
        if delta.abs() <= 0.000_999 {
            prop_assert!(result.is_ok());
        } else if delta.abs() > 0.001_001 {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn valid_specifications_have_stochastic_rows(seed_row in prop::array::uniform4(0.01f64..1.0)) {
        let total: f64 = seed_row.iter().sum();
        let mut doc = sample_document();
        let row = doc.disease_transitions.get_mut("NAIVE").unwrap();
        for (state, value) in DiseaseState::ALL.iter().zip(seed_row) {
            row.insert(state.label().to_string(), value / total);
        }
        let spec = load(&doc).unwrap();
        for state in DiseaseState::ALL {
            let sum: f64 = spec.parameters().disease_transitions.row(state).iter().sum();
            prop_assert!((sum - 1.0).abs() <= 1e-3);
            prop_assert!(spec.parameters().disease_transitions.row(state).iter().all(|p| *p >= 0.0));
        }
    }
}
