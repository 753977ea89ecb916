//! Disease activity classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Disease activity as assessed at a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiseaseState {
    Naive,
    Stable,
    Active,
    HighlyActive,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown disease state '{0}'")]
pub struct ParseDiseaseStateError(pub String);

impl DiseaseState {
    pub const COUNT: usize = 4;

    /// Every state, in table order.
    pub const ALL: [DiseaseState; Self::COUNT] = [
        DiseaseState::Naive,
        DiseaseState::Stable,
        DiseaseState::Active,
        DiseaseState::HighlyActive,
    ];

    /// Row/column position of this state in fixed-size tables.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            DiseaseState::Naive => 0,
            DiseaseState::Stable => 1,
            DiseaseState::Active => 2,
            DiseaseState::HighlyActive => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether this state is a clinical trigger for treatment and interval shortening.
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, DiseaseState::Active | DiseaseState::HighlyActive)
    }

    /// Label used as transition-table key, e.g. `HIGHLY_ACTIVE`.
    pub const fn label(self) -> &'static str {
        match self {
            DiseaseState::Naive => "NAIVE",
            DiseaseState::Stable => "STABLE",
            DiseaseState::Active => "ACTIVE",
            DiseaseState::HighlyActive => "HIGHLY_ACTIVE",
        }
    }

    /// Lower-case prefix used in vision scenario keys, e.g. `highly_active`.
    pub const fn scenario_prefix(self) -> &'static str {
        match self {
            DiseaseState::Naive => "naive",
            DiseaseState::Stable => "stable",
            DiseaseState::Active => "active",
            DiseaseState::HighlyActive => "highly_active",
        }
    }
}

impl fmt::Display for DiseaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DiseaseState {
    type Err = ParseDiseaseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseDiseaseStateError(s.to_string()))
    }
}
