//! # Patient enrollment
//!
//! Arrivals follow a homogeneous Poisson process with rate
//! `target / duration_days`. Generation stops at the target count or at the
//! horizon, whichever comes first, so a run may enroll fewer patients than
//! requested.

use amdsim_core::time::add_days;
use amdsim_core::{PatientId, SimulationError};
use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::Serialize;
use tracing::debug;

/// One scheduled arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arrival {
    pub patient: PatientId,
    /// Fractional days since the start date.
    pub offset_days: f64,
    /// Calendar day of the arrival (offset floored).
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrollmentScheduler {
    start_date: NaiveDate,
    target: u32,
    duration_days: f64,
}

impl EnrollmentScheduler {
    pub fn new(start_date: NaiveDate, target: u32, duration_days: f64) -> Self {
        Self {
            start_date,
            target,
            duration_days,
        }
    }

    /// Arrivals per day.
    pub fn rate(&self) -> f64 {
        if self.duration_days > 0.0 {
            f64::from(self.target) / self.duration_days
        } else {
            0.0
        }
    }

    /// Generates the arrival sequence. Patient ids are assigned in arrival
    /// order starting at 1.
    ///
    /// Fails when the duration is not a finite number of days.
    pub fn schedule<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Arrival>, SimulationError> {
        if self.target == 0 {
            return Ok(Vec::new());
        }
        if !self.duration_days.is_finite() || self.duration_days <= 0.0 {
            return Err(SimulationError::Sampling(format!(
                "enrollment duration of {} days",
                self.duration_days
            )));
        }
        let gap = Exp::new(self.rate())
            .map_err(|err| SimulationError::Sampling(format!("arrival rate {}: {err}", self.rate())))?;

        let mut arrivals = Vec::with_capacity(self.target as usize);
        let mut offset = 0.0;
        for index in 1..=self.target {
            offset += gap.sample(rng);
            if offset > self.duration_days {
                break;
            }
            arrivals.push(Arrival {
                patient: PatientId::new(index),
                offset_days: offset,
                date: add_days(self.start_date, offset.floor() as u64),
            });
        }

        debug!(
            target = self.target,
            generated = arrivals.len(),
            rate_per_day = self.rate(),
            "Enrollment scheduled"
        );
        Ok(arrivals)
    }
}

/// Summary recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnrollmentSummary {
    pub target: u32,
    pub generated: u32,
    pub rate_per_day: f64,
    pub first_arrival: Option<NaiveDate>,
    pub last_arrival: Option<NaiveDate>,
}

impl EnrollmentSummary {
    pub fn new(scheduler: &EnrollmentScheduler, arrivals: &[Arrival]) -> Self {
        Self {
            target: scheduler.target,
            generated: arrivals.len() as u32,
            rate_per_day: scheduler.rate(),
            first_arrival: arrivals.first().map(|a| a.date),
            last_arrival: arrivals.last().map(|a| a.date),
        }
    }
}
