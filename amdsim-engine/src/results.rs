//! # Simulation results
//!
//! Aggregates are computed once from the final patient map. The fingerprint
//! is a BLAKE3 hash over every visit of every patient in id order and is the
//! value compared when checking reproducibility across runs and engines.

use std::collections::btree_map;
use std::collections::BTreeMap;

use amdsim_config::EngineType;
use amdsim_core::{Patient, PatientId};
use amdsim_telemetry::RunCounts;
use blake3::Hasher;
use chrono::Datelike;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResults {
    pub engine: EngineType,
    pub seed: u64,
    pub patient_count: usize,
    pub total_injections: u64,
    pub total_visits: u64,
    pub final_vision_mean: f64,
    /// Population standard deviation.
    pub final_vision_std: f64,
    pub mean_vision_change: f64,
    /// Share of patients discontinued when the run ended.
    pub discontinuation_rate: f64,
    /// Patients discontinued at least once.
    pub ever_discontinued: usize,
    pub retreatment_count: usize,
    pub fingerprint: String,
    pub patients: BTreeMap<PatientId, Patient>,
}

/// Aggregates without the per-patient histories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsSummary {
    pub engine: EngineType,
    pub seed: u64,
    pub patient_count: usize,
    pub total_injections: u64,
    pub total_visits: u64,
    pub final_vision_mean: f64,
    pub final_vision_std: f64,
    pub mean_vision_change: f64,
    pub discontinuation_rate: f64,
    pub ever_discontinued: usize,
    pub retreatment_count: usize,
    pub fingerprint: String,
}

impl SimulationResults {
    pub fn new(engine: EngineType, seed: u64, patients: BTreeMap<PatientId, Patient>) -> Self {
        let count = patients.len();
        let total_injections = patients
            .values()
            .map(|p| u64::from(p.injection_count()))
            .sum();
        let total_visits = patients
            .values()
            .map(|p| p.visit_history().len() as u64)
            .sum();
        let (final_vision_mean, final_vision_std) =
            mean_and_std(patients.values().map(Patient::current_vision));
        let (mean_vision_change, _) = mean_and_std(patients.values().map(Patient::vision_change));
        let discontinued = patients.values().filter(|p| p.is_discontinued()).count();
        let discontinuation_rate = if count == 0 {
            0.0
        } else {
            discontinued as f64 / count as f64
        };

        Self {
            engine,
            seed,
            patient_count: count,
            total_injections,
            total_visits,
            final_vision_mean,
            final_vision_std,
            mean_vision_change,
            discontinuation_rate,
            ever_discontinued: patients
                .values()
                .filter(|p| !p.discontinuations().is_empty())
                .count(),
            retreatment_count: patients.values().map(|p| p.retreatments().len()).sum(),
            fingerprint: fingerprint(&patients),
            patients,
        }
    }

    /// BLAKE3 hash (hex) of all visit sequences.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn patient(&self, id: PatientId) -> Option<&Patient> {
        self.patients.get(&id)
    }

    /// Lazily walks patients in id order, `size` at a time.
    pub fn patient_batches(&self, size: usize) -> PatientBatches<'_> {
        PatientBatches {
            patients: self.patients.values(),
            size: size.max(1),
        }
    }

    pub fn summary(&self) -> ResultsSummary {
        ResultsSummary {
            engine: self.engine,
            seed: self.seed,
            patient_count: self.patient_count,
            total_injections: self.total_injections,
            total_visits: self.total_visits,
            final_vision_mean: self.final_vision_mean,
            final_vision_std: self.final_vision_std,
            mean_vision_change: self.mean_vision_change,
            discontinuation_rate: self.discontinuation_rate,
            ever_discontinued: self.ever_discontinued,
            retreatment_count: self.retreatment_count,
            fingerprint: self.fingerprint.clone(),
        }
    }

    /// Totals reported to the metrics recorder.
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            patients: self.patient_count as u64,
            visits: self.total_visits,
            injections: self.total_injections,
            discontinuations: self
                .patients
                .values()
                .filter(|p| p.is_discontinued())
                .count() as u64,
            retreatments: self.retreatment_count as u64,
        }
    }
}

/// Iterator over fixed-size batches of patients.
#[derive(Debug, Clone)]
pub struct PatientBatches<'a> {
    patients: btree_map::Values<'a, PatientId, Patient>,
    size: usize,
}

impl<'a> Iterator for PatientBatches<'a> {
    type Item = Vec<&'a Patient>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<&Patient> = self.patients.by_ref().take(self.size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

fn mean_and_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, variance.sqrt())
}

fn fingerprint(patients: &BTreeMap<PatientId, Patient>) -> String {
    let mut hasher = Hasher::new();
    for (id, patient) in patients {
        hasher.update(&id.get().to_le_bytes());
        hasher.update(&(patient.visit_history().len() as u64).to_le_bytes());
        for visit in patient.visit_history() {
            hasher.update(&visit.date.num_days_from_ce().to_le_bytes());
            hasher.update(&[
                visit.disease_state.index() as u8,
                u8::from(visit.treatment_given),
            ]);
            hasher.update(&visit.vision.to_bits().to_le_bytes());
        }
    }
    hex::encode(hasher.finalize().as_bytes())
}
