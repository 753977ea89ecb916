//! ## amdsim-core::patient
//! **Per-patient record and lifecycle**
//!
//! A `Patient` is created by an engine when it arrives, mutated only by that
//! engine through the explicit operations below, and handed over to the run
//! results when the simulation completes.
//!
//! Lifecycle: `Active` → `Discontinued` → (optionally) `Active` again through
//! retreatment. Discontinued patients keep their history for aggregation.

mod visit;

use std::fmt;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::disease::DiseaseState;
use crate::error::InvariantViolation;
use crate::time::{add_days, days_between, DAYS_PER_MONTH};

pub use visit::Visit;

/// Lowest representable vision score.
pub const MIN_VISION: f64 = 0.0;
/// Highest representable vision score.
pub const MAX_VISION: f64 = 100.0;

/// Stable identifier assigned in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(u32);

impl PatientId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:05}", self.0)
    }
}

/// Reason a patient stopped treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscontinuationType {
    PoorVision,
    HighInjection,
    LongTreatment,
    TimeBased,
}

impl DiscontinuationType {
    pub const fn label(self) -> &'static str {
        match self {
            DiscontinuationType::PoorVision => "poor_vision",
            DiscontinuationType::HighInjection => "high_injection",
            DiscontinuationType::LongTreatment => "long_treatment",
            DiscontinuationType::TimeBased => "time_based",
        }
    }
}

impl fmt::Display for DiscontinuationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatientStatus {
    Active,
    Discontinued {
        kind: DiscontinuationType,
        date: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscontinuationRecord {
    pub date: NaiveDate,
    pub kind: DiscontinuationType,
    pub injections: u32,
    pub vision: f64,
}

/// Retreatment event, keeping the discontinuation it ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetreatmentRecord {
    pub date: NaiveDate,
    pub prior_discontinuation: DiscontinuationType,
    pub discontinued_on: NaiveDate,
    pub days_off_treatment: i64,
    pub course_reset: bool,
}

/// Span of treatment the duration and injection-count rules are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreatmentCourse {
    pub start_date: Option<NaiveDate>,
    pub injections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    id: PatientId,
    enrollment_date: NaiveDate,
    baseline_vision: f64,
    current_vision: f64,
    current_state: DiseaseState,
    current_interval_days: u32,
    injection_count: u32,
    visit_history: Vec<Visit>,
    course: TreatmentCourse,
    status: PatientStatus,
    discontinuations: Vec<DiscontinuationRecord>,
    retreatments: Vec<RetreatmentRecord>,
    response_multiplier: f64,
}

impl Patient {
    /// Creates a treatment-naive patient at enrollment.
    pub fn new(
        id: PatientId,
        enrollment_date: NaiveDate,
        baseline_vision: f64,
        initial_interval_days: u32,
        response_multiplier: f64,
    ) -> Self {
        Self {
            id,
            enrollment_date,
            baseline_vision,
            current_vision: baseline_vision,
            current_state: DiseaseState::Naive,
            current_interval_days: initial_interval_days,
            injection_count: 0,
            visit_history: Vec::new(),
            course: TreatmentCourse::default(),
            status: PatientStatus::Active,
            discontinuations: Vec::new(),
            retreatments: Vec::new(),
            response_multiplier,
        }
    }

    pub fn id(&self) -> PatientId {
        self.id
    }

    pub fn enrollment_date(&self) -> NaiveDate {
        self.enrollment_date
    }

    pub fn baseline_vision(&self) -> f64 {
        self.baseline_vision
    }

    pub fn current_vision(&self) -> f64 {
        self.current_vision
    }

    pub fn current_state(&self) -> DiseaseState {
        self.current_state
    }

    pub fn current_interval_days(&self) -> u32 {
        self.current_interval_days
    }

    pub fn injection_count(&self) -> u32 {
        self.injection_count
    }

    pub fn visit_history(&self) -> &[Visit] {
        &self.visit_history
    }

    pub fn status(&self) -> PatientStatus {
        self.status
    }

    pub fn course(&self) -> TreatmentCourse {
        self.course
    }

    pub fn discontinuations(&self) -> &[DiscontinuationRecord] {
        &self.discontinuations
    }

    pub fn retreatments(&self) -> &[RetreatmentRecord] {
        &self.retreatments
    }

    /// Scale applied to treated vision changes.
    pub fn response_multiplier(&self) -> f64 {
        self.response_multiplier
    }

    pub fn is_discontinued(&self) -> bool {
        matches!(self.status, PatientStatus::Discontinued { .. })
    }

    pub fn discontinuation_type(&self) -> Option<DiscontinuationType> {
        match self.status {
            PatientStatus::Discontinued { kind, .. } => Some(kind),
            PatientStatus::Active => None,
        }
    }

    pub fn discontinuation_date(&self) -> Option<NaiveDate> {
        match self.status {
            PatientStatus::Discontinued { date, .. } => Some(date),
            PatientStatus::Active => None,
        }
    }

    pub fn last_visit(&self) -> Option<&Visit> {
        self.visit_history.last()
    }

    pub fn is_first_visit(&self) -> bool {
        self.visit_history.is_empty()
    }

    /// Whether the most recent visit delivered an injection.
    pub fn is_under_treatment(&self) -> bool {
        self.last_visit().is_some_and(|v| v.treatment_given)
    }

    pub fn last_treatment_date(&self) -> Option<NaiveDate> {
        self.visit_history
            .iter()
            .rev()
            .find(|v| v.treatment_given)
            .map(|v| v.date)
    }

    pub fn days_since_last_treatment(&self, date: NaiveDate) -> Option<i64> {
        self.last_treatment_date()
            .map(|treated_on| days_between(treated_on, date))
    }

    /// Months elapsed since the first visit of the current course.
    pub fn months_on_course(&self, date: NaiveDate) -> f64 {
        self.course
            .start_date
            .map(|start| days_between(start, date) as f64 / DAYS_PER_MONTH)
            .unwrap_or(0.0)
    }

    pub fn vision_change(&self) -> f64 {
        self.current_vision - self.baseline_vision
    }

    /// Appends a visit and applies its outcome to the patient state.
    pub fn record_visit(&mut self, visit: Visit) -> Result<(), InvariantViolation> {
        if self.is_discontinued() {
            return Err(self.violation(visit.date, "visit recorded while discontinued"));
        }
        if let Some(last) = self.last_visit() {
            if visit.date < last.date {
                return Err(self.violation(
                    visit.date,
                    format!("visit precedes previous visit on {}", last.date),
                ));
            }
        }
        if !(MIN_VISION..=MAX_VISION).contains(&visit.vision) {
            return Err(self.violation(
                visit.date,
                format!("vision {} outside [0, 100]", visit.vision),
            ));
        }

        self.current_state = visit.disease_state;
        self.current_vision = visit.vision;
        if self.course.start_date.is_none() {
            self.course.start_date = Some(visit.date);
        }
        if visit.treatment_given {
            self.injection_count += 1;
            self.course.injections += 1;
        }
        self.visit_history.push(visit);
        Ok(())
    }

    /// Stores the next treatment interval and returns the date it lands on.
    pub fn reschedule(
        &mut self,
        date: NaiveDate,
        interval_days: u32,
        bounds: RangeInclusive<u32>,
    ) -> Result<NaiveDate, InvariantViolation> {
        if !bounds.contains(&interval_days) {
            return Err(self.violation(
                date,
                format!(
                    "interval {interval_days} outside [{}, {}]",
                    bounds.start(),
                    bounds.end()
                ),
            ));
        }
        self.current_interval_days = interval_days;
        Ok(add_days(date, u64::from(interval_days)))
    }

    /// Updates the disease state observed outside a treatment visit.
    pub fn apply_progression(&mut self, state: DiseaseState) {
        self.current_state = state;
    }

    /// Stops scheduling for this patient.
    pub fn discontinue(
        &mut self,
        date: NaiveDate,
        kind: DiscontinuationType,
    ) -> Result<(), InvariantViolation> {
        if let PatientStatus::Discontinued { kind: prior, .. } = self.status {
            return Err(self.violation(date, format!("already discontinued ({prior})")));
        }
        self.status = PatientStatus::Discontinued { kind, date };
        self.discontinuations.push(DiscontinuationRecord {
            date,
            kind,
            injections: self.injection_count,
            vision: self.current_vision,
        });
        Ok(())
    }

    /// Reactivates a discontinued patient.
    ///
    /// With `reset_course` the injection count and course start used by the
    /// discontinuation rules restart from the next visit.
    pub fn retreat(
        &mut self,
        date: NaiveDate,
        reset_course: bool,
    ) -> Result<RetreatmentRecord, InvariantViolation> {
        let PatientStatus::Discontinued {
            kind,
            date: discontinued_on,
        } = self.status
        else {
            return Err(self.violation(date, "retreatment of an active patient"));
        };
        if date < discontinued_on {
            return Err(self.violation(
                date,
                format!("retreatment precedes discontinuation on {discontinued_on}"),
            ));
        }

        let record = RetreatmentRecord {
            date,
            prior_discontinuation: kind,
            discontinued_on,
            days_off_treatment: days_between(discontinued_on, date),
            course_reset: reset_course,
        };
        self.status = PatientStatus::Active;
        if reset_course {
            self.course = TreatmentCourse::default();
        }
        self.retreatments.push(record);
        Ok(record)
    }

    fn violation(&self, date: NaiveDate, detail: impl Into<String>) -> InvariantViolation {
        InvariantViolation::new(self.id, date, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u64) -> NaiveDate {
        add_days(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), n)
    }

    fn patient() -> Patient {
        Patient::new(PatientId::new(1), day(0), 70.0, 28, 1.0)
    }

    #[test]
    fn new_patient_is_naive_and_active() {
        let p = patient();
        assert_eq!(p.current_state(), DiseaseState::Naive);
        assert_eq!(p.current_vision(), 70.0);
        assert!(p.is_first_visit());
        assert!(!p.is_discontinued());
        assert_eq!(p.id().to_string(), "P00001");
    }

    #[test]
    fn record_visit_updates_state_and_counters() {
        let mut p = patient();
        p.record_visit(Visit::new(day(0), DiseaseState::Active, true, 72.0))
            .unwrap();
        p.record_visit(Visit::new(day(28), DiseaseState::Stable, false, 73.0))
            .unwrap();

        assert_eq!(p.injection_count(), 1);
        assert_eq!(p.course().injections, 1);
        assert_eq!(p.course().start_date, Some(day(0)));
        assert_eq!(p.current_state(), DiseaseState::Stable);
        assert_eq!(p.current_vision(), 73.0);
        assert_eq!(p.last_treatment_date(), Some(day(0)));
        assert_eq!(p.days_since_last_treatment(day(40)), Some(40));
        assert!(!p.is_under_treatment());
        assert_eq!(p.vision_change(), 3.0);
    }

    #[test]
    fn rejects_out_of_order_visit() {
        let mut p = patient();
        p.record_visit(Visit::new(day(10), DiseaseState::Active, true, 70.0))
            .unwrap();
        let err = p
            .record_visit(Visit::new(day(5), DiseaseState::Active, true, 70.0))
            .unwrap_err();
        assert_eq!(err.patient, PatientId::new(1));
        assert!(err.detail.contains("precedes"));
        assert_eq!(p.visit_history().len(), 1);
    }

    #[test]
    fn rejects_vision_out_of_range() {
        let mut p = patient();
        assert!(p
            .record_visit(Visit::new(day(0), DiseaseState::Active, true, 100.5))
            .is_err());
    }

    #[test]
    fn reschedule_enforces_bounds() {
        let mut p = patient();
        assert_eq!(p.reschedule(day(0), 42, 28..=112).unwrap(), day(42));
        assert_eq!(p.current_interval_days(), 42);
        assert!(p.reschedule(day(0), 120, 28..=112).is_err());
        assert_eq!(p.current_interval_days(), 42);
    }

    #[test]
    fn discontinue_then_retreat_records_prior_type() {
        let mut p = patient();
        p.record_visit(Visit::new(day(0), DiseaseState::Active, true, 60.0))
            .unwrap();
        p.discontinue(day(0), DiscontinuationType::HighInjection)
            .unwrap();
        assert!(p.is_discontinued());
        assert_eq!(
            p.discontinuation_type(),
            Some(DiscontinuationType::HighInjection)
        );
        assert!(p
            .record_visit(Visit::new(day(10), DiseaseState::Active, true, 60.0))
            .is_err());
        assert!(p.discontinue(day(1), DiscontinuationType::PoorVision).is_err());

        let record = p.retreat(day(90), true).unwrap();
        assert_eq!(record.prior_discontinuation, DiscontinuationType::HighInjection);
        assert_eq!(record.days_off_treatment, 90);
        assert!(!p.is_discontinued());
        assert_eq!(p.course(), TreatmentCourse::default());
        assert_eq!(p.injection_count(), 1);
        assert_eq!(p.discontinuations().len(), 1);
        assert_eq!(p.retreatments().len(), 1);
    }

    #[test]
    fn retreat_keeps_course_without_reset() {
        let mut p = patient();
        p.record_visit(Visit::new(day(0), DiseaseState::Active, true, 60.0))
            .unwrap();
        p.discontinue(day(0), DiscontinuationType::LongTreatment)
            .unwrap();
        p.retreat(day(30), false).unwrap();
        assert_eq!(p.course().injections, 1);
        assert_eq!(p.course().start_date, Some(day(0)));
    }

    #[test]
    fn retreating_active_patient_fails() {
        let mut p = patient();
        assert!(p.retreat(day(10), false).is_err());
    }

    #[test]
    fn months_on_course_uses_average_month() {
        let mut p = patient();
        p.record_visit(Visit::new(day(0), DiseaseState::Active, true, 60.0))
            .unwrap();
        let months = p.months_on_course(day(365));
        assert!((months - 365.0 / DAYS_PER_MONTH).abs() < 1e-9);
    }
}
