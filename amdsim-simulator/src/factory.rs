//! Patient construction at arrival.

use amdsim_config::{BaselineVision, ConfigError, ProtocolSpecification};
use amdsim_core::{Patient, PatientId};
use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Creates patients with sampled baseline vision and, when the response
/// heterogeneity overlay is enabled, a responder category.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFactory {
    baseline: Normal<f64>,
    min_vision: f64,
    max_vision: f64,
    initial_interval_days: u32,
    /// Cumulative probability and multiplier per responder category.
    responders: Option<Vec<(f64, f64)>>,
}

impl PatientFactory {
    pub fn from_spec(spec: &ProtocolSpecification) -> Result<Self, ConfigError> {
        let params = spec.parameters();
        let responders = params
            .clinical_improvements
            .response_heterogeneity()
            .map(|r| {
                r.categories
                    .iter()
                    .map(|c| (c.probability, c.multiplier))
                    .collect::<Vec<_>>()
            });
        Self::new(&params.baseline_vision, params.min_interval_days, responders)
    }

    /// `responders` holds `(probability, multiplier)` pairs.
    pub fn new(
        baseline: &BaselineVision,
        initial_interval_days: u32,
        responders: Option<Vec<(f64, f64)>>,
    ) -> Result<Self, ConfigError> {
        let distribution = Normal::new(baseline.mean, baseline.std)
            .map_err(|err| ConfigError::Inconsistent(format!("baseline_vision: {err}")))?;
        let responders = responders.map(|categories| {
            let mut cumulative = 0.0;
            categories
                .into_iter()
                .map(|(p, multiplier)| {
                    cumulative += p;
                    (cumulative, multiplier)
                })
                .collect()
        });
        Ok(Self {
            baseline: distribution,
            min_vision: baseline.min,
            max_vision: baseline.max,
            initial_interval_days,
            responders,
        })
    }

    /// Builds the patient arriving on `enrollment_date`.
    ///
    /// Draws baseline vision first, then one uniform for the responder
    /// category when heterogeneity is enabled.
    pub fn create<R: Rng + ?Sized>(
        &self,
        id: PatientId,
        enrollment_date: NaiveDate,
        rng: &mut R,
    ) -> Patient {
        let vision = self
            .baseline
            .sample(rng)
            .clamp(self.min_vision, self.max_vision);
        let multiplier = match &self.responders {
            Some(categories) => {
                let u: f64 = rng.random();
                categories
                    .iter()
                    .find(|(cumulative, _)| u < *cumulative)
                    .or(categories.last())
                    .map(|(_, multiplier)| *multiplier)
                    .unwrap_or(1.0)
            }
            None => 1.0,
        };
        Patient::new(
            id,
            enrollment_date,
            vision,
            self.initial_interval_days,
            multiplier,
        )
    }
}
