//! Run configuration.
//!
//! Hierarchy:
//! 1. Default values
//! 2. `config/amdsim.yaml`, if present
//! 3. `AMDSIM_*` environment variables

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use amdsim_core::error::ParameterError;
use amdsim_core::time::{add_days, horizon_days};
use chrono::NaiveDate;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::ConfigError;

/// Default location of the run configuration file.
pub const DEFAULT_RUN_CONFIG: &str = "config/amdsim.yaml";

/// Simulation driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    /// Agent-based: a global day clock steps every patient.
    Abs,
    /// Discrete-event: a priority queue of scheduled visits.
    Des,
}

impl EngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Abs => "abs",
            EngineType::Des => "des",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abs" | "agent" => Ok(EngineType::Abs),
            "des" | "event" => Ok(EngineType::Des),
            _ => Err(ParameterError::UnknownEngine(s.to_string())),
        }
    }
}

/// Defaults for runs started without explicit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RunConfig {
    /// `abs` or `des`; parsed when run parameters are built.
    pub engine: String,
    pub n_patients: i64,
    #[validate(range(min = 0.0))]
    pub duration_years: f64,
    pub seed: u64,
    pub start_date: NaiveDate,
    /// Directory the CLI writes results to.
    pub output_dir: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineType::Abs.as_str().to_string(),
            n_patients: 100,
            duration_years: 5.0,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
            output_dir: "output".to_string(),
        }
    }
}

impl RunConfig {
    /// Load from `config/amdsim.yaml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_RUN_CONFIG)
    }

    /// Load from a specific file (if present) and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut figment = Figment::from(Serialized::defaults(RunConfig::default()));
        if path.exists() {
            figment = figment.merge(Yaml::file(path));
        } else {
            debug!(path = %path.display(), "Run configuration not found, using defaults");
        }

        figment
            .merge(Env::prefixed("AMDSIM_"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Validate the configured values into run parameters.
    pub fn parameters(&self) -> Result<RunParameters, ParameterError> {
        RunParameters::new(
            self.engine.parse()?,
            self.n_patients,
            self.duration_years,
            self.seed,
            self.start_date,
        )
    }
}

/// Validated parameters of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunParameters {
    pub engine: EngineType,
    pub n_patients: u32,
    pub duration_years: f64,
    pub seed: u64,
    pub start_date: NaiveDate,
    /// Horizon in days, `round(duration_years * 365.25)`.
    pub horizon_days: u32,
}

impl RunParameters {
    pub fn new(
        engine: EngineType,
        n_patients: i64,
        duration_years: f64,
        seed: u64,
        start_date: NaiveDate,
    ) -> Result<Self, ParameterError> {
        if n_patients < 0 {
            return Err(ParameterError::NegativePatientCount(n_patients));
        }
        let n_patients = u32::try_from(n_patients)
            .map_err(|_| ParameterError::PatientCountOutOfRange(n_patients))?;
        if !duration_years.is_finite() || duration_years <= 0.0 {
            return Err(ParameterError::NonPositiveDuration(duration_years));
        }
        let horizon = horizon_days(duration_years);
        let horizon_days = u32::try_from(horizon)
            .ok()
            .filter(|&days| days > 0 && add_days(start_date, u64::from(days)) < NaiveDate::MAX)
            .ok_or(ParameterError::HorizonOutOfRange(horizon))?;

        Ok(Self {
            engine,
            n_patients,
            duration_years,
            seed,
            start_date,
            horizon_days,
        })
    }

    /// Last simulated date; events after it are not processed.
    pub fn end_date(&self) -> NaiveDate {
        add_days(self.start_date, u64::from(self.horizon_days))
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
}
