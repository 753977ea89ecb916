//! Visual acuity change per visit.

use amdsim_config::{ConfigError, ProtocolSpecification, VisionChangeModel};
use amdsim_core::patient::{MAX_VISION, MIN_VISION};
use amdsim_core::DiseaseState;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Normal vision-change distributions for every `(state, treated)` scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionModel {
    scenarios: [[Normal<f64>; 2]; DiseaseState::COUNT],
}

impl VisionModel {
    pub fn from_spec(spec: &ProtocolSpecification) -> Result<Self, ConfigError> {
        Self::new(&spec.parameters().vision_change_model)
    }

    pub fn new(model: &VisionChangeModel) -> Result<Self, ConfigError> {
        let build = |state: DiseaseState, treated: bool| {
            let change = model.get(state, treated);
            Normal::new(change.mean, change.std).map_err(|err| {
                ConfigError::Inconsistent(format!(
                    "vision scenario {}: {err}",
                    VisionChangeModel::scenario_key(state, treated)
                ))
            })
        };
        let mut scenarios = [[build(DiseaseState::Naive, false)?; 2]; DiseaseState::COUNT];
        for state in DiseaseState::ALL {
            for treated in [false, true] {
                scenarios[state.index()][usize::from(treated)] = build(state, treated)?;
            }
        }
        Ok(Self { scenarios })
    }

    /// Draws the change in letters for one visit.
    ///
    /// Treated changes are scaled by the patient's response multiplier.
    pub fn change<R: Rng + ?Sized>(
        &self,
        state: DiseaseState,
        treated: bool,
        response_multiplier: f64,
        rng: &mut R,
    ) -> f64 {
        let draw = self.scenarios[state.index()][usize::from(treated)].sample(rng);
        if treated {
            draw * response_multiplier
        } else {
            draw
        }
    }

    /// Applies a change and clamps the result to the ETDRS scale.
    #[inline]
    pub fn apply(current: f64, change: f64) -> f64 {
        (current + change).clamp(MIN_VISION, MAX_VISION)
    }
}
