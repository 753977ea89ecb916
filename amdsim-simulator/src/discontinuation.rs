//! # Discontinuation and retreatment
//!
//! Every check draws one uniform number per rule, in a fixed order, whether
//! or not the rule applies. The random stream therefore advances the same
//! way for every patient history, which keeps the agent and event engines
//! aligned.

use amdsim_config::{
    DiscontinuationRules, ProtocolSpecification, RetreatmentRules, TimeBasedDiscontinuation,
};
use amdsim_core::time::{days_between, DAYS_PER_YEAR};
use amdsim_core::{DiscontinuationType, Patient};
use chrono::NaiveDate;
use rand::Rng;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub struct DiscontinuationPolicy {
    rules: DiscontinuationRules,
    retreatment: RetreatmentRules,
    time_based: Option<TimeBasedDiscontinuation>,
}

impl DiscontinuationPolicy {
    pub fn from_spec(spec: &ProtocolSpecification) -> Self {
        let params = spec.parameters();
        Self::new(
            params.discontinuation_rules,
            params.retreatment,
            params
                .clinical_improvements
                .time_based_discontinuation()
                .cloned(),
        )
    }

    pub fn new(
        rules: DiscontinuationRules,
        retreatment: RetreatmentRules,
        time_based: Option<TimeBasedDiscontinuation>,
    ) -> Self {
        Self {
            rules,
            retreatment,
            time_based,
        }
    }

    /// Checks the stopping rules after a visit on `date`.
    ///
    /// Draws four uniforms in order: poor vision, high injection count,
    /// long treatment, time based. The first rule whose condition holds and
    /// whose draw succeeds wins.
    pub fn should_discontinue<R: Rng + ?Sized>(
        &self,
        patient: &Patient,
        date: NaiveDate,
        rng: &mut R,
    ) -> Option<DiscontinuationType> {
        let draws: [f64; 4] = [rng.random(), rng.random(), rng.random(), rng.random()];
        let rules = &self.rules;
        let course = patient.course();

        let candidates = [
            (
                DiscontinuationType::PoorVision,
                patient.current_vision() < rules.poor_vision_threshold,
                rules.poor_vision_probability,
            ),
            (
                DiscontinuationType::HighInjection,
                course.injections > rules.high_injection_count,
                rules.high_injection_probability,
            ),
            (
                DiscontinuationType::LongTreatment,
                patient.months_on_course(date) > rules.long_treatment_months,
                rules.long_treatment_probability,
            ),
            (
                DiscontinuationType::TimeBased,
                self.time_based.is_some(),
                self.time_based_probability(patient, date),
            ),
        ];

        let outcome = candidates
            .into_iter()
            .zip(draws)
            .find(|((_, applies, probability), u)| *applies && u < probability)
            .map(|((kind, _, _), _)| kind);
        if let Some(kind) = outcome {
            trace!(patient = %patient.id(), %date, reason = kind.label(), "Discontinuation triggered");
        }
        outcome
    }

    /// Per-visit probability derived from the annual rate for the patient's course year.
    pub fn time_based_probability(&self, patient: &Patient, date: NaiveDate) -> f64 {
        let Some(time_based) = &self.time_based else {
            return 0.0;
        };
        let days_on_course = patient
            .course()
            .start_date
            .map(|start| days_between(start, date).max(0))
            .unwrap_or(0);
        let year = (days_on_course as f64 / DAYS_PER_YEAR).floor() as usize;
        let annual = time_based.annual_probability(year);
        let fraction = f64::from(patient.current_interval_days()) / DAYS_PER_YEAR;
        1.0 - (1.0 - annual).powf(fraction)
    }

    /// Decides retreatment at a monitoring check. Consumes exactly one draw.
    pub fn should_retreat<R: Rng + ?Sized>(&self, patient: &Patient, rng: &mut R) -> bool {
        let u: f64 = rng.random();
        patient.current_state().is_active() && u < self.retreatment.probability
    }

    /// Days between monitoring checks of a discontinued patient.
    pub fn monitoring_interval_days(&self) -> u32 {
        self.retreatment.monitoring_interval_days
    }

    /// Whether retreatment restarts the course counters.
    pub fn reset_course_on_retreatment(&self) -> bool {
        self.retreatment.reset_course_on_retreatment
    }
}
