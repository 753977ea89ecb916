mod common;

use amdsim_config::improvements::ClinicalImprovementsDocument;
use amdsim_config::{EngineType, TimeBasedDiscontinuation};
use amdsim_core::{DiscontinuationType, ParameterError, SimulationError};
use amdsim_engine::{EngineError, SimulationResults};
use chrono::NaiveDate;
use common::*;

fn scenario_document() -> amdsim_config::ProtocolDocument {
    let mut doc = sample_document();
    doc.min_interval_days = 28;
    doc.max_interval_days = 112;
    doc.extension_days = 14;
    doc.shortening_days = 14;
    doc.baseline_vision.mean = 70.0;
    doc.baseline_vision.std = 10.0;
    doc.baseline_vision.min = 40.0;
    doc.baseline_vision.max = 90.0;
    stable_when_treated(&mut doc);
    doc
}

#[test]
fn ten_patient_scenario_enrolls_everyone() {
    let mut runner = runner(&scenario_document());
    for engine in [EngineType::Abs, EngineType::Des] {
        let results = runner.run(engine, 10, 1.0, 42).unwrap();
        assert_eq!(results.patient_count, 10);
        assert_eq!(results.patients.len(), 10);
        assert!(results.total_injections > 0);
        assert!((0.0..=1.0).contains(&results.discontinuation_rate));
    }
}

#[test]
fn zero_patients_yields_empty_results() {
    let mut runner = runner(&sample_document());
    for engine in [EngineType::Abs, EngineType::Des] {
        let results = runner.run(engine, 0, 2.0, 7).unwrap();
        assert_eq!(results.patient_count, 0);
        assert_eq!(results.total_injections, 0);
        assert!(results.patients.is_empty());
        assert_eq!(results.discontinuation_rate, 0.0);
    }
}

#[test]
fn same_seed_reproduces_results() {
    let mut runner = runner(&sample_document());
    for engine in [EngineType::Abs, EngineType::Des] {
        let first = runner.run(engine, 60, 3.0, 1234).unwrap();
        let second = runner.run(engine, 60, 3.0, 1234).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }
}

#[test]
fn different_seeds_diverge() {
    let mut runner = runner(&sample_document());
    let a = runner.run(EngineType::Abs, 40, 2.0, 1).unwrap();
    let b = runner.run(EngineType::Abs, 40, 2.0, 2).unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn agent_and_event_engines_agree() {
    let mut doc = sample_document();
    doc.discontinuation_rules.high_injection_count = 6;
    doc.discontinuation_rules.high_injection_probability = 0.3;
    doc.retreatment.probability = 0.8;
    let mut runner = runner(&doc);

    for seed in [1, 42, 2024, 99_999] {
        let abs = runner.run(EngineType::Abs, 80, 3.0, seed).unwrap();
        let des = runner.run(EngineType::Des, 80, 3.0, seed).unwrap();
        assert_eq!(abs.fingerprint(), des.fingerprint(), "seed {seed}");
        assert_eq!(abs.patients, des.patients, "seed {seed}");
        assert_eq!(abs.total_injections, des.total_injections);
        assert_eq!(abs.retreatment_count, des.retreatment_count);
    }
}

fn assert_invariants(results: &SimulationResults, doc: &amdsim_config::ProtocolDocument, end: NaiveDate) {
    for patient in results.patients.values() {
        let history = patient.visit_history();
        let Some(first) = history.first() else {
            continue;
        };
        assert_eq!(first.date, patient.enrollment_date());
        assert!(first.treatment_given);
        for pair in history.windows(2) {
            assert!(pair[0].date <= pair[1].date, "{}", patient.id());
        }
        for visit in history {
            assert!((0.0..=100.0).contains(&visit.vision));
            assert!(visit.date <= end);
        }
        assert!((doc.min_interval_days..=doc.max_interval_days)
            .contains(&patient.current_interval_days()));
        assert_eq!(
            patient.injection_count() as usize,
            history.iter().filter(|v| v.treatment_given).count()
        );
    }
}

#[test]
fn population_respects_invariants() {
    let doc = sample_document();
    let mut runner = runner(&doc);
    let end = NaiveDate::from_ymd_opt(2029, 1, 1).unwrap();
    for engine in [EngineType::Abs, EngineType::Des] {
        let results = runner.run(engine, 150, 5.0, 77).unwrap();
        assert!(results.total_visits >= results.total_injections);
        assert_invariants(&results, &doc, end);
    }
}

#[test]
fn high_injection_discontinuation_is_labelled_once() {
    let mut doc = sample_document();
    without_discontinuation(&mut doc);
    doc.treat_when_stable = true;
    doc.discontinuation_rules.high_injection_count = 3;
    doc.discontinuation_rules.high_injection_probability = 1.0;
    doc.retreatment.probability = 0.0;

    let results = runner(&doc).run(EngineType::Des, 50, 2.0, 5).unwrap();
    let mut discontinued = 0;
    for patient in results.patients.values() {
        if patient.injection_count() < 4 {
            assert!(!patient.is_discontinued());
            continue;
        }
        discontinued += 1;
        assert_eq!(
            patient.discontinuation_type(),
            Some(DiscontinuationType::HighInjection)
        );
        assert_eq!(patient.discontinuations().len(), 1);
        assert_eq!(patient.discontinuations()[0].injections, 4);
        assert_eq!(patient.injection_count(), 4);
        assert_eq!(
            patient.discontinuation_date(),
            patient.visit_history().last().map(|v| v.date)
        );
    }
    assert!(discontinued > 0);
    assert_eq!(
        results.discontinuation_rate,
        discontinued as f64 / results.patient_count as f64
    );
}

#[test]
fn certain_time_based_stopping_ends_every_course() {
    let mut doc = sample_document();
    without_discontinuation(&mut doc);
    doc.retreatment.probability = 0.0;
    doc.clinical_improvements = Some(ClinicalImprovementsDocument {
        time_based_discontinuation: Some(TimeBasedDiscontinuation {
            enabled: true,
            annual_probabilities: vec![1.0],
        }),
        ..ClinicalImprovementsDocument::default()
    });

    let mut runner = runner(&doc);
    for engine in [EngineType::Abs, EngineType::Des] {
        let results = runner.run(engine, 20, 1.0, 9).unwrap();
        assert!(results.patient_count > 0);
        assert_eq!(results.discontinuation_rate, 1.0);
        for patient in results.patients.values() {
            assert_eq!(
                patient.discontinuation_type(),
                Some(DiscontinuationType::TimeBased)
            );
            assert_eq!(patient.discontinuations().len(), 1);
            assert_eq!(patient.visit_history().len(), 1);
        }
    }
}

#[test]
fn discontinued_patients_are_retreated_on_active_disease() {
    let mut doc = sample_document();
    without_discontinuation(&mut doc);
    doc.discontinuation_rules.high_injection_count = 2;
    doc.discontinuation_rules.high_injection_probability = 1.0;
    doc.retreatment.probability = 1.0;
    doc.retreatment.reset_course_on_retreatment = true;

    let results = runner(&doc).run(EngineType::Abs, 60, 3.0, 11).unwrap();
    assert!(results.retreatment_count > 0);
    assert!(results.ever_discontinued >= results.patients.values().filter(|p| p.is_discontinued()).count());

    for patient in results.patients.values() {
        for record in patient.retreatments() {
            assert_eq!(record.prior_discontinuation, DiscontinuationType::HighInjection);
            assert!(record.days_off_treatment >= i64::from(doc.retreatment.monitoring_interval_days));
            let visit = patient
                .visit_history()
                .iter()
                .find(|v| v.date == record.date)
                .expect("retreatment visit recorded the same day");
            assert!(visit.disease_state.is_active());
            assert!(visit.treatment_given);
        }
    }
}

#[test]
fn invalid_parameters_are_rejected_before_running() {
    let mut runner = runner(&sample_document());
    assert!(matches!(
        runner.run(EngineType::Abs, -5, 1.0, 1),
        Err(EngineError::Simulation(SimulationError::Parameter(
            ParameterError::NegativePatientCount(-5)
        )))
    ));
    assert!(matches!(
        runner.run(EngineType::Des, 5, 0.0, 1),
        Err(EngineError::Simulation(SimulationError::Parameter(
            ParameterError::NonPositiveDuration(_)
        )))
    ));
    assert!(matches!(
        runner.run_named("monte_carlo", 5, 1.0, 1),
        Err(EngineError::Simulation(SimulationError::Parameter(
            ParameterError::UnknownEngine(_)
        )))
    ));
    assert_eq!(runner.audit().events("simulation_failed").count(), 3);
    assert_eq!(runner.audit().events("simulation_start").count(), 0);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn any_seed_keeps_invariants_and_engines_aligned(seed in any::<u64>(), patients in 0i64..40) {
            let doc = sample_document();
            let mut runner = runner(&doc);
            let abs = runner.run(EngineType::Abs, patients, 2.0, seed).unwrap();
            let des = runner.run(EngineType::Des, patients, 2.0, seed).unwrap();
            prop_assert_eq!(abs.fingerprint(), des.fingerprint());
            prop_assert!(abs.patient_count <= patients as usize);
            assert_invariants(&abs, &doc, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        }
    }
}
