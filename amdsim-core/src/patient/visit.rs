use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::disease::DiseaseState;

/// A single clinic visit as recorded in a patient's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub date: NaiveDate,
    pub disease_state: DiseaseState,
    pub treatment_given: bool,
    /// Vision (ETDRS letters) after this visit's change was applied.
    pub vision: f64,
}

impl Visit {
    pub fn new(
        date: NaiveDate,
        disease_state: DiseaseState,
        treatment_given: bool,
        vision: f64,
    ) -> Self {
        Self {
            date,
            disease_state,
            treatment_given,
            vision,
        }
    }
}
