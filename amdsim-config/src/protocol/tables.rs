//! Typed parameter tables.
//!
//! Protocol documents key their tables by strings. Once validated, every
//! table is held as a fixed-size array indexed by `DiseaseState`, so lookups
//! are exhaustive and cannot miss at run time.

use std::collections::BTreeMap;

use amdsim_core::DiseaseState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed deviation of a probability row from 1.0.
pub const ROW_SUM_TOLERANCE: f64 = 1e-3;

/// `from-state -> to-state -> value` as written in a protocol document.
pub type StateTable = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("unknown disease state '{0}'")]
    UnknownState(String),
    #[error("missing row for {0}")]
    MissingRow(DiseaseState),
    #[error("row {row} is missing an entry for {column}")]
    MissingEntry {
        row: DiseaseState,
        column: DiseaseState,
    },
    #[error("row {row} has a negative entry for {column} ({value})")]
    Negative {
        row: DiseaseState,
        column: DiseaseState,
        value: f64,
    },
    #[error("row {row} has a non-finite entry for {column}")]
    NonFinite {
        row: DiseaseState,
        column: DiseaseState,
    },
    #[error("row {row} sums to {sum:.6}, expected 1.0 ± {tolerance}", tolerance = ROW_SUM_TOLERANCE)]
    RowSum { row: DiseaseState, sum: f64 },
    #[error("unknown vision scenario '{0}'")]
    UnknownScenario(String),
    #[error("missing vision scenario '{0}'")]
    MissingScenario(String),
    #[error("vision scenario '{key}' has invalid parameters (mean {mean}, std {std})")]
    InvalidScenario { key: String, mean: f64, std: f64 },
}

/// Parses a complete 4×4 table of finite, non-negative values.
pub fn parse_state_table(table: &StateTable) -> Result<[[f64; 4]; 4], TableError> {
    for (row_key, row) in table {
        row_key
            .parse::<DiseaseState>()
            .map_err(|_| TableError::UnknownState(row_key.clone()))?;
        for column_key in row.keys() {
            column_key
                .parse::<DiseaseState>()
                .map_err(|_| TableError::UnknownState(column_key.clone()))?;
        }
    }

    let mut values = [[0.0; 4]; 4];
    for row in DiseaseState::ALL {
        let entries = lookup(table, row.label()).ok_or(TableError::MissingRow(row))?;
        for column in DiseaseState::ALL {
            let value = *lookup(entries, column.label())
                .ok_or(TableError::MissingEntry { row, column })?;
            if !value.is_finite() {
                return Err(TableError::NonFinite { row, column });
            }
            if value < 0.0 {
                return Err(TableError::Negative { row, column, value });
            }
            values[row.index()][column.index()] = value;
        }
    }
    Ok(values)
}

fn lookup<'a, V>(map: &'a BTreeMap<String, V>, label: &str) -> Option<&'a V> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(label))
        .map(|(_, value)| value)
}

/// Checks every row sums to 1.0 within tolerance.
pub fn check_row_sums(values: &[[f64; 4]; 4]) -> Result<(), TableError> {
    for row in DiseaseState::ALL {
        let sum: f64 = values[row.index()].iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(TableError::RowSum { row, sum });
        }
    }
    Ok(())
}

fn to_state_table(values: &[[f64; 4]; 4]) -> StateTable {
    DiseaseState::ALL
        .into_iter()
        .map(|row| {
            let entries = DiseaseState::ALL
                .into_iter()
                .map(|column| {
                    let value = values[row.index()][column.index()];
                    (column.label().to_string(), value)
                })
                .collect();
            (row.label().to_string(), entries)
        })
        .collect()
}

/// Row-stochastic disease transition probabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionMatrix([[f64; 4]; 4]);

impl TransitionMatrix {
    pub fn from_table(table: &StateTable) -> Result<Self, TableError> {
        let values = parse_state_table(table)?;
        check_row_sums(&values)?;
        Ok(Self(values))
    }

    #[inline]
    pub fn row(&self, from: DiseaseState) -> &[f64; 4] {
        &self.0[from.index()]
    }

    #[inline]
    pub fn probability(&self, from: DiseaseState, to: DiseaseState) -> f64 {
        self.0[from.index()][to.index()]
    }

    pub fn to_table(&self) -> StateTable {
        to_state_table(&self.0)
    }
}

/// Non-negative per-transition multipliers applied while a patient is treated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectMultipliers([[f64; 4]; 4]);

impl EffectMultipliers {
    pub fn from_table(table: &StateTable) -> Result<Self, TableError> {
        parse_state_table(table).map(Self)
    }

    #[inline]
    pub fn row(&self, from: DiseaseState) -> &[f64; 4] {
        &self.0[from.index()]
    }

    pub fn to_table(&self) -> StateTable {
        to_state_table(&self.0)
    }
}

/// Normal distribution parameters for the change in vision at one visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisionChange {
    pub mean: f64,
    pub std: f64,
}

/// Vision-change parameters for every `(state, treated)` scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionChangeModel([[VisionChange; 2]; 4]);

impl VisionChangeModel {
    /// Document key of a scenario, e.g. `highly_active_untreated`.
    pub fn scenario_key(state: DiseaseState, treated: bool) -> String {
        let suffix = if treated { "treated" } else { "untreated" };
        format!("{}_{}", state.scenario_prefix(), suffix)
    }

    pub fn from_scenarios(scenarios: &BTreeMap<String, VisionChange>) -> Result<Self, TableError> {
        let known: Vec<String> = DiseaseState::ALL
            .into_iter()
            .flat_map(|state| [false, true].map(|treated| Self::scenario_key(state, treated)))
            .collect();
        if let Some(unknown) = scenarios.keys().find(|key| !known.contains(key)) {
            return Err(TableError::UnknownScenario(unknown.clone()));
        }

        let placeholder = VisionChange {
            mean: 0.0,
            std: 0.0,
        };
        let mut table = [[placeholder; 2]; 4];
        for state in DiseaseState::ALL {
            for treated in [false, true] {
                let key = Self::scenario_key(state, treated);
                let change = *scenarios
                    .get(&key)
                    .ok_or_else(|| TableError::MissingScenario(key.clone()))?;
                if !change.mean.is_finite() || !change.std.is_finite() || change.std < 0.0 {
                    return Err(TableError::InvalidScenario {
                        key,
                        mean: change.mean,
                        std: change.std,
                    });
                }
                table[state.index()][usize::from(treated)] = change;
            }
        }
        Ok(Self(table))
    }

    #[inline]
    pub fn get(&self, state: DiseaseState, treated: bool) -> VisionChange {
        self.0[state.index()][usize::from(treated)]
    }

    pub fn to_scenarios(&self) -> BTreeMap<String, VisionChange> {
        DiseaseState::ALL
            .into_iter()
            .flat_map(|state| {
                [false, true].map(|treated| {
                    (Self::scenario_key(state, treated), self.get(state, treated))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_table() -> StateTable {
        let mut values = [[0.0; 4]; 4];
        for state in DiseaseState::ALL {
            values[state.index()][state.index()] = 1.0;
        }
        to_state_table(&values)
    }

    #[test]
    fn parses_complete_table() {
        let matrix = TransitionMatrix::from_table(&identity_table()).unwrap();
        assert_eq!(
            matrix.probability(DiseaseState::Stable, DiseaseState::Stable),
            1.0
        );
        assert_eq!(matrix.row(DiseaseState::Active), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn table_round_trips() {
        let table = identity_table();
        let matrix = TransitionMatrix::from_table(&table).unwrap();
        assert_eq!(matrix.to_table(), table);
    }

    #[test]
    fn rejects_row_sum_outside_tolerance() {
        let mut table = identity_table();
        table.get_mut("STABLE").unwrap().insert("ACTIVE".into(), 0.01);
        assert!(matches!(
            TransitionMatrix::from_table(&table),
            Err(TableError::RowSum {
                row: DiseaseState::Stable,
                ..
            })
        ));
    }

    #[test]
    fn accepts_row_sum_within_tolerance() {
        let mut table = identity_table();
        table.get_mut("STABLE").unwrap().insert("ACTIVE".into(), 0.0009);
        assert!(TransitionMatrix::from_table(&table).is_ok());
    }

    #[test]
    fn rejects_negative_entry() {
        let mut table = identity_table();
        let row = table.get_mut("ACTIVE").unwrap();
        row.insert("ACTIVE".into(), 1.2);
        row.insert("STABLE".into(), -0.2);
        assert!(matches!(
            TransitionMatrix::from_table(&table),
            Err(TableError::Negative { .. })
        ));
    }

    #[test]
    fn rejects_missing_row_and_entry() {
        let mut table = identity_table();
        table.remove("NAIVE");
        assert_eq!(
            TransitionMatrix::from_table(&table),
            Err(TableError::MissingRow(DiseaseState::Naive))
        );

        let mut table = identity_table();
        table.get_mut("NAIVE").unwrap().remove("STABLE");
        assert!(matches!(
            TransitionMatrix::from_table(&table),
            Err(TableError::MissingEntry { .. })
        ));
    }

    #[test]
    fn rejects_unknown_state() {
        let mut table = identity_table();
        table.insert("DORMANT".into(), BTreeMap::new());
        assert_eq!(
            TransitionMatrix::from_table(&table),
            Err(TableError::UnknownState("DORMANT".into()))
        );
    }

    fn scenarios() -> BTreeMap<String, VisionChange> {
        DiseaseState::ALL
            .into_iter()
            .flat_map(|state| {
                [false, true].map(|treated| {
                    (
                        VisionChangeModel::scenario_key(state, treated),
                        VisionChange {
                            mean: if treated { 1.0 } else { -1.0 },
                            std: 0.5,
                        },
                    )
                })
            })
            .collect()
    }

    #[test]
    fn vision_model_covers_all_scenarios() {
        let model = VisionChangeModel::from_scenarios(&scenarios()).unwrap();
        assert_eq!(model.get(DiseaseState::HighlyActive, true).mean, 1.0);
        assert_eq!(model.get(DiseaseState::Naive, false).mean, -1.0);
        assert_eq!(model.to_scenarios(), scenarios());
    }

    #[test]
    fn vision_model_rejects_missing_and_unknown() {
        let mut missing = scenarios();
        missing.remove("stable_untreated");
        assert_eq!(
            VisionChangeModel::from_scenarios(&missing),
            Err(TableError::MissingScenario("stable_untreated".into()))
        );

        let mut unknown = scenarios();
        unknown.insert(
            "dormant_treated".into(),
            VisionChange {
                mean: 0.0,
                std: 1.0,
            },
        );
        assert!(matches!(
            VisionChangeModel::from_scenarios(&unknown),
            Err(TableError::UnknownScenario(_))
        ));
    }

    #[test]
    fn vision_model_rejects_negative_std() {
        let mut bad = scenarios();
        bad.insert(
            "active_treated".into(),
            VisionChange {
                mean: 0.0,
                std: -1.0,
            },
        );
        assert!(matches!(
            VisionChangeModel::from_scenarios(&bad),
            Err(TableError::InvalidScenario { .. })
        ));
    }
}
