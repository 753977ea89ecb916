//! # Treat-and-extend decisions
//!
//! Decides whether a visit delivers an injection and how far away the next
//! visit is. The assessed disease state is the patient's current state once
//! progression for the visit has been applied.

use std::ops::RangeInclusive;

use amdsim_config::{LoadingPhase, ProtocolSpecification};
use amdsim_core::time::add_days;
use amdsim_core::{DiseaseState, Patient};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentProtocol {
    min_interval_days: u32,
    max_interval_days: u32,
    extension_days: u32,
    shortening_days: u32,
    treat_when_stable: bool,
    loading_phase: Option<LoadingPhase>,
}

impl TreatmentProtocol {
    pub fn from_spec(spec: &ProtocolSpecification) -> Self {
        let params = spec.parameters();
        Self {
            min_interval_days: params.min_interval_days,
            max_interval_days: params.max_interval_days,
            extension_days: params.extension_days,
            shortening_days: params.shortening_days,
            treat_when_stable: params.treat_when_stable,
            loading_phase: params.clinical_improvements.loading_phase().copied(),
        }
    }

    pub fn interval_bounds(&self) -> RangeInclusive<u32> {
        self.min_interval_days..=self.max_interval_days
    }

    /// Interval of a newly enrolled patient.
    pub fn initial_interval(&self) -> u32 {
        self.min_interval_days
    }

    /// Whether the visit on `date` delivers an injection.
    pub fn should_treat(&self, patient: &Patient, _date: NaiveDate) -> bool {
        if patient.is_first_visit() || patient.current_state().is_active() {
            return true;
        }
        self.treat_when_stable
    }

    /// Next visit date and the interval that leads to it.
    ///
    /// Called after the visit has been recorded, so `patient` already
    /// reflects this visit's state and injection count.
    pub fn next_visit_date(
        &self,
        patient: &Patient,
        date: NaiveDate,
        treated: bool,
    ) -> (NaiveDate, u32) {
        let interval = self.next_interval(patient, treated);
        (add_days(date, u64::from(interval)), interval)
    }

    fn next_interval(&self, patient: &Patient, treated: bool) -> u32 {
        if let Some(loading) = &self.loading_phase {
            // The count already includes this visit's injection.
            if treated && patient.injection_count() < loading.doses {
                return loading
                    .interval_days
                    .clamp(self.min_interval_days, self.max_interval_days);
            }
        }

        let current = patient.current_interval_days();
        match patient.current_state() {
            DiseaseState::Naive => self.min_interval_days,
            DiseaseState::Stable => current
                .saturating_add(self.extension_days)
                .min(self.max_interval_days),
            DiseaseState::Active | DiseaseState::HighlyActive => current
                .saturating_sub(self.shortening_days)
                .max(self.min_interval_days),
        }
        .clamp(self.min_interval_days, self.max_interval_days)
    }
}
