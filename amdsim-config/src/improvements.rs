//! Clinical improvement overlays.
//!
//! Optional behaviour modifiers applied at patient construction: a loading
//! phase of closely spaced initial injections, heterogeneous response to
//! treatment, and time-based discontinuation. Each overlay is configured in
//! its own optional block with an explicit `enabled` flag.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicalImprovementsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_phase: Option<LoadingPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_heterogeneity: Option<ResponseHeterogeneity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_based_discontinuation: Option<TimeBasedDiscontinuation>,
}

/// Initial doses given at a fixed short interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoadingPhase {
    pub enabled: bool,
    #[validate(range(min = 1, max = 12))]
    pub doses: u32,
    #[validate(range(min = 1, max = 3650))]
    pub interval_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ResponseCategory {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub probability: f64,
    /// Scale applied to treated vision changes.
    #[validate(range(min = 0.0, max = 10.0))]
    pub multiplier: f64,
}

/// Patients are assigned a responder category at enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ResponseHeterogeneity {
    pub enabled: bool,
    #[validate(length(min = 1), nested)]
    pub categories: Vec<ResponseCategory>,
}

impl ResponseHeterogeneity {
    pub fn probabilities(&self) -> Vec<f64> {
        self.categories.iter().map(|c| c.probability).collect()
    }
}

/// Annual probability of stopping treatment, by year on the current course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TimeBasedDiscontinuation {
    pub enabled: bool,
    #[validate(custom(function = validation::validate_probabilities))]
    pub annual_probabilities: Vec<f64>,
}

impl TimeBasedDiscontinuation {
    /// Annual probability for a zero-based course year; the last entry covers later years.
    pub fn annual_probability(&self, year: usize) -> f64 {
        self.annual_probabilities
            .get(year)
            .or(self.annual_probabilities.last())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Validated overlay set threaded through patient construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClinicalImprovements {
    loading_phase: Option<LoadingPhase>,
    response_heterogeneity: Option<ResponseHeterogeneity>,
    time_based_discontinuation: Option<TimeBasedDiscontinuation>,
}

impl ClinicalImprovements {
    /// No overlay configured.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_document(
        document: &ClinicalImprovementsDocument,
        interval_bounds: (u32, u32),
    ) -> Result<Self, ConfigError> {
        if let Some(loading) = &document.loading_phase {
            loading.validate()?;
            let (min, max) = interval_bounds;
            if !(min..=max).contains(&loading.interval_days) {
                return Err(ConfigError::Inconsistent(format!(
                    "loading_phase.interval_days {} outside [{min}, {max}]",
                    loading.interval_days
                )));
            }
        }
        if let Some(response) = &document.response_heterogeneity {
            response.validate()?;
            validation::validate_distribution(&response.probabilities()).map_err(|err| {
                ConfigError::Inconsistent(format!(
                    "response_heterogeneity.categories: {}",
                    err.message.unwrap_or(err.code)
                ))
            })?;
        }
        if let Some(time_based) = &document.time_based_discontinuation {
            time_based.validate()?;
        }

        Ok(Self {
            loading_phase: document.loading_phase,
            response_heterogeneity: document.response_heterogeneity.clone(),
            time_based_discontinuation: document.time_based_discontinuation.clone(),
        })
    }

    pub fn to_document(&self) -> Option<ClinicalImprovementsDocument> {
        if self.loading_phase.is_none()
            && self.response_heterogeneity.is_none()
            && self.time_based_discontinuation.is_none()
        {
            return None;
        }
        Some(ClinicalImprovementsDocument {
            loading_phase: self.loading_phase,
            response_heterogeneity: self.response_heterogeneity.clone(),
            time_based_discontinuation: self.time_based_discontinuation.clone(),
        })
    }

    /// Loading phase, if enabled.
    pub fn loading_phase(&self) -> Option<&LoadingPhase> {
        self.loading_phase.as_ref().filter(|l| l.enabled)
    }

    /// Response heterogeneity, if enabled.
    pub fn response_heterogeneity(&self) -> Option<&ResponseHeterogeneity> {
        self.response_heterogeneity.as_ref().filter(|r| r.enabled)
    }

    /// Time-based discontinuation, if enabled.
    pub fn time_based_discontinuation(&self) -> Option<&TimeBasedDiscontinuation> {
        self.time_based_discontinuation
            .as_ref()
            .filter(|t| t.enabled)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_names().is_empty()
    }

    /// Names of the enabled overlays, for audit records.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.loading_phase().is_some() {
            names.push("loading_phase");
        }
        if self.response_heterogeneity().is_some() {
            names.push("response_heterogeneity");
        }
        if self.time_based_discontinuation().is_some() {
            names.push("time_based_discontinuation");
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> ClinicalImprovementsDocument {
        ClinicalImprovementsDocument {
            loading_phase: Some(LoadingPhase {
                enabled: true,
                doses: 3,
                interval_days: 28,
            }),
            response_heterogeneity: Some(ResponseHeterogeneity {
                enabled: true,
                categories: vec![
                    ResponseCategory {
                        name: "good".into(),
                        probability: 0.3,
                        multiplier: 1.8,
                    },
                    ResponseCategory {
                        name: "average".into(),
                        probability: 0.5,
                        multiplier: 1.0,
                    },
                    ResponseCategory {
                        name: "poor".into(),
                        probability: 0.2,
                        multiplier: 0.5,
                    },
                ],
            }),
            time_based_discontinuation: Some(TimeBasedDiscontinuation {
                enabled: false,
                annual_probabilities: vec![0.125, 0.15, 0.12],
            }),
        }
    }

    #[test]
    fn enabled_overlays_are_reported() {
        let overlays = ClinicalImprovements::from_document(&document(), (28, 112)).unwrap();
        assert!(overlays.any_enabled());
        assert_eq!(
            overlays.enabled_names(),
            vec!["loading_phase", "response_heterogeneity"]
        );
        assert!(overlays.time_based_discontinuation().is_none());
        assert_eq!(overlays.to_document(), Some(document()));
    }

    #[test]
    fn none_is_inactive() {
        let overlays = ClinicalImprovements::none();
        assert!(!overlays.any_enabled());
        assert!(overlays.to_document().is_none());
    }

    #[test]
    fn rejects_category_distribution_not_summing_to_one() {
        let mut doc = document();
        if let Some(r) = doc.response_heterogeneity.as_mut() {
            r.categories[0].probability = 0.9;
        }
        assert!(matches!(
            ClinicalImprovements::from_document(&doc, (28, 112)),
            Err(ConfigError::Inconsistent(_))
        ));
    }

    #[test]
    fn rejects_loading_interval_outside_bounds() {
        let mut doc = document();
        if let Some(l) = doc.loading_phase.as_mut() {
            l.interval_days = 14;
        }
        assert!(ClinicalImprovements::from_document(&doc, (28, 112)).is_err());
    }

    #[test]
    fn annual_probability_reuses_last_year() {
        let tbd = TimeBasedDiscontinuation {
            enabled: true,
            annual_probabilities: vec![0.1, 0.2],
        };
        assert_eq!(tbd.annual_probability(0), 0.1);
        assert_eq!(tbd.annual_probability(1), 0.2);
        assert_eq!(tbd.annual_probability(5), 0.2);
    }
}
