//! Per-visit state transitions shared by both engines.

use std::sync::Arc;

use amdsim_core::time::add_days;
use amdsim_core::{DiseaseState, InvariantViolation, Patient, PatientId, Visit};
use amdsim_simulator::{ClinicalModel, VisionModel};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use tracing::trace;

/// A patient together with its private random stream and next due date.
#[derive(Debug, Clone)]
pub struct PatientSlot {
    pub patient: Patient,
    pub rng: StdRng,
    pub next_due: NaiveDate,
}

impl PatientSlot {
    pub fn id(&self) -> PatientId {
        self.patient.id()
    }
}

#[derive(Debug, Clone)]
pub struct VisitProcessor {
    model: Arc<ClinicalModel>,
}

impl VisitProcessor {
    pub fn new(model: Arc<ClinicalModel>) -> Self {
        Self { model }
    }

    /// Creates the patient arriving on `date`, due for a first visit the same day.
    pub fn enroll(&self, id: PatientId, date: NaiveDate, mut rng: StdRng) -> PatientSlot {
        let patient = self.model.factory.create(id, date, &mut rng);
        trace!(patient = %id, %date, baseline = patient.baseline_vision(), "Patient enrolled");
        PatientSlot {
            patient,
            rng,
            next_due: date,
        }
    }

    /// Handles whatever is due for the patient on `date` and stores the next due date.
    ///
    /// Active patients get a treatment visit. Discontinued patients get a
    /// monitoring check; on retreatment the visit follows on the same date
    /// using the state assessed at the check.
    pub fn step(&self, slot: &mut PatientSlot, date: NaiveDate) -> Result<NaiveDate, InvariantViolation> {
        if slot.next_due != date {
            return Err(InvariantViolation::new(
                slot.id(),
                date,
                format!("processed on {date} but due on {}", slot.next_due),
            ));
        }

        let next = if slot.patient.is_discontinued() {
            match self.monitor(slot, date)? {
                Some(assessed) => self.visit(slot, date, Some(assessed))?,
                None => self.monitoring_date(date),
            }
        } else {
            self.visit(slot, date, None)?
        };
        slot.next_due = next;
        Ok(next)
    }

    /// Returns the assessed state when the patient is retreated.
    fn monitor(
        &self,
        slot: &mut PatientSlot,
        date: NaiveDate,
    ) -> Result<Option<DiseaseState>, InvariantViolation> {
        let model = &self.model;
        let patient = &mut slot.patient;
        let state = model.disease.progress(
            patient.current_state(),
            patient.days_since_last_treatment(date),
            false,
            &mut slot.rng,
        );
        patient.apply_progression(state);

        if !model.discontinuation.should_retreat(patient, &mut slot.rng) {
            trace!(patient = %patient.id(), %date, state = %state, "Monitoring check");
            return Ok(None);
        }
        let record = patient.retreat(date, model.discontinuation.reset_course_on_retreatment())?;
        trace!(
            patient = %patient.id(),
            %date,
            prior = record.prior_discontinuation.label(),
            days_off = record.days_off_treatment,
            "Patient retreated"
        );
        Ok(Some(state))
    }

    fn visit(
        &self,
        slot: &mut PatientSlot,
        date: NaiveDate,
        assessed: Option<DiseaseState>,
    ) -> Result<NaiveDate, InvariantViolation> {
        let model = &self.model;
        let patient = &mut slot.patient;
        let rng = &mut slot.rng;

        let state = match assessed {
            Some(state) => state,
            None => model.disease.progress(
                patient.current_state(),
                patient.days_since_last_treatment(date),
                patient.is_under_treatment(),
                rng,
            ),
        };
        patient.apply_progression(state);

        let treated = model.protocol.should_treat(patient, date);
        let change = model
            .vision
            .change(state, treated, patient.response_multiplier(), rng);
        let vision = VisionModel::apply(patient.current_vision(), change);
        patient.record_visit(Visit::new(date, state, treated, vision))?;

        let (_, interval) = model.protocol.next_visit_date(patient, date, treated);
        let next = patient.reschedule(date, interval, model.protocol.interval_bounds())?;
        trace!(
            patient = %patient.id(),
            %date,
            state = %state,
            treated,
            vision,
            interval,
            "Visit processed"
        );

        match model.discontinuation.should_discontinue(patient, date, rng) {
            Some(kind) => {
                patient.discontinue(date, kind)?;
                Ok(self.monitoring_date(date))
            }
            None => Ok(next),
        }
    }

    fn monitoring_date(&self, date: NaiveDate) -> NaiveDate {
        add_days(
            date,
            u64::from(self.model.discontinuation.monitoring_interval_days()),
        )
    }
}
