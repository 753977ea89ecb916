//! # Disease progression
//!
//! Discrete-time Markov model over the four disease states. The effective
//! treated and untreated rows are computed once at construction so sampling
//! is a single uniform draw against a cumulative row.

use amdsim_config::{ConfigError, ProtocolSpecification};
use amdsim_core::DiseaseState;
use rand::Rng;
use tracing::trace;

const N: usize = DiseaseState::COUNT;

#[derive(Debug, Clone, PartialEq)]
pub struct DiseaseModel {
    untreated: [[f64; N]; N],
    treated: [[f64; N]; N],
}

impl DiseaseModel {
    pub fn from_spec(spec: &ProtocolSpecification) -> Result<Self, ConfigError> {
        let params = spec.parameters();
        let mut untreated = [[0.0; N]; N];
        let mut effects = [[0.0; N]; N];
        for state in DiseaseState::ALL {
            untreated[state.index()] = *params.disease_transitions.row(state);
            effects[state.index()] = *params.treatment_effect_on_transitions.row(state);
        }
        Self::new(untreated, effects)
    }

    /// Builds the model from raw transition rows and treatment multipliers.
    pub fn new(transitions: [[f64; N]; N], effects: [[f64; N]; N]) -> Result<Self, ConfigError> {
        let mut untreated = [[0.0; N]; N];
        let mut treated = [[0.0; N]; N];
        for from in DiseaseState::ALL {
            let i = from.index();
            untreated[i] = normalize(from, transitions[i], "untreated")?;
            let mut scaled = transitions[i];
            for (p, m) in scaled.iter_mut().zip(effects[i]) {
                *p *= m;
            }
            treated[i] = normalize(from, scaled, "treated")?;
        }
        Ok(Self { untreated, treated })
    }

    /// Effective transition row out of `from`.
    pub fn row(&self, from: DiseaseState, treated: bool) -> &[f64; N] {
        if treated {
            &self.treated[from.index()]
        } else {
            &self.untreated[from.index()]
        }
    }

    /// Samples the next state. Consumes exactly one uniform draw.
    ///
    /// The treatment effect is binary; `days_since_last_treatment` is only
    /// recorded in traces.
    pub fn progress<R: Rng + ?Sized>(
        &self,
        current: DiseaseState,
        days_since_last_treatment: Option<i64>,
        treated: bool,
        rng: &mut R,
    ) -> DiseaseState {
        let u: f64 = rng.random();
        let next = sample_row(self.row(current, treated), u);
        trace!(
            from = %current,
            to = %next,
            treated,
            days_since_last_treatment,
            "Disease progression"
        );
        next
    }
}

fn normalize(
    from: DiseaseState,
    mut row: [f64; N],
    kind: &str,
) -> Result<[f64; N], ConfigError> {
    let total: f64 = row.iter().sum();
    if !total.is_finite() || total <= 0.0 || row.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(ConfigError::InvalidTransitions(format!(
            "effective {kind} row {from} is not a probability distribution (mass {total})"
        )));
    }
    for p in &mut row {
        *p /= total;
    }
    Ok(row)
}

/// Inverse-CDF lookup of `u` in a normalized row.
fn sample_row(row: &[f64; N], u: f64) -> DiseaseState {
    let mut cumulative = 0.0;
    let mut last_possible = DiseaseState::Naive;
    for state in DiseaseState::ALL {
        let p = row[state.index()];
        if p > 0.0 {
            cumulative += p;
            last_possible = state;
            if u < cumulative {
                return state;
            }
        }
    }
    // Rounding can leave the cumulative sum just below 1.0.
    last_possible
}
