//! ## amdsim-core::events
//! **Scheduled patient events for the event-stepped engine**
//!
//! Events are ordered by `(date, kind, patient)`: on any given day arrivals
//! come before visits, and patients are served in id order. This is the same
//! order the agent-stepped engine walks its population in.

pub mod queue;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::patient::PatientId;

pub use queue::{EventError, EventQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Patient enrolls and is created.
    Arrival,
    /// Patient is due: a treatment visit or, when discontinued, a retreatment check.
    VisitDue,
}

/// A patient event on the simulation timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduledEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub patient: PatientId,
}

impl ScheduledEvent {
    #[inline]
    pub fn arrival(date: NaiveDate, patient: PatientId) -> Self {
        Self {
            date,
            kind: EventKind::Arrival,
            patient,
        }
    }

    #[inline]
    pub fn visit(date: NaiveDate, patient: PatientId) -> Self {
        Self {
            date,
            kind: EventKind::VisitDue,
            patient,
        }
    }
}
