//! Custom validation functions for protocol documents.
//!
//! Table checks delegate to the typed table constructors so a document is
//! accepted by validation exactly when it can be converted.

use std::borrow::Cow;
use std::collections::BTreeMap;

use validator::ValidationError;

use crate::protocol::tables::{
    parse_state_table, StateTable, TableError, TransitionMatrix, VisionChange, VisionChangeModel,
    ROW_SUM_TOLERANCE,
};

/// The only protocol family this engine simulates.
pub const TREAT_AND_EXTEND: &str = "treat_and_extend";

fn table_error(code: &'static str, err: TableError) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(err.to_string()))
}

/// Validate the protocol family.
pub fn validate_protocol_type(value: &str) -> Result<(), ValidationError> {
    if value == TREAT_AND_EXTEND {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_protocol_type").with_message(Cow::Owned(format!(
            "protocol_type must be '{TREAT_AND_EXTEND}', got '{value}'"
        ))))
    }
}

/// Validate that a transition table is a complete row-stochastic matrix.
pub fn validate_transition_rows(table: &StateTable) -> Result<(), ValidationError> {
    TransitionMatrix::from_table(table)
        .map(|_| ())
        .map_err(|err| table_error("invalid_transition_table", err))
}

/// Validate that a multiplier table is complete and non-negative.
pub fn validate_multiplier_rows(table: &StateTable) -> Result<(), ValidationError> {
    parse_state_table(table)
        .map(|_| ())
        .map_err(|err| table_error("invalid_multiplier_table", err))
}

/// Validate that all eight vision-change scenarios are present and well formed.
pub fn validate_vision_scenarios(
    scenarios: &BTreeMap<String, VisionChange>,
) -> Result<(), ValidationError> {
    VisionChangeModel::from_scenarios(scenarios)
        .map(|_| ())
        .map_err(|err| table_error("invalid_vision_model", err))
}

/// Validate a list of probabilities.
pub fn validate_probabilities(values: &[f64]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::new("empty_probabilities"));
    }
    if values
        .iter()
        .any(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
    {
        return Err(ValidationError::new("probability_out_of_range"));
    }
    Ok(())
}

/// Validate that a set of probabilities forms a distribution.
pub fn validate_distribution(values: &[f64]) -> Result<(), ValidationError> {
    validate_probabilities(values)?;
    let sum: f64 = values.iter().sum();
    if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
        return Err(
            ValidationError::new("distribution_sum").with_message(Cow::Owned(format!(
                "probabilities sum to {sum:.6}, expected 1.0"
            ))),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_type_must_be_treat_and_extend() {
        assert!(validate_protocol_type("treat_and_extend").is_ok());
        assert!(validate_protocol_type("fixed_interval").is_err());
    }

    #[test]
    fn distribution_must_sum_to_one() {
        assert!(validate_distribution(&[0.3, 0.4, 0.3]).is_ok());
        assert!(validate_distribution(&[0.3, 0.4, 0.4]).is_err());
        assert!(validate_distribution(&[]).is_err());
        assert!(validate_distribution(&[1.5, -0.5]).is_err());
    }

    #[test]
    fn probabilities_must_be_in_unit_interval() {
        assert!(validate_probabilities(&[0.0, 0.2, 1.0]).is_ok());
        assert!(validate_probabilities(&[f64::NAN]).is_err());
        assert!(validate_probabilities(&[1.01]).is_err());
    }
}
