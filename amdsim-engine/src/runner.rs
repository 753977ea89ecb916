//! # Simulation runner
//!
//! Turns a validated protocol into simulation runs. The runner owns the
//! audit trail for everything it does and never writes files; callers
//! export the audit log and results themselves.

use std::sync::Arc;
use std::time::Instant;

use amdsim_config::{EngineType, ProtocolSpecification, RunParameters};
use amdsim_simulator::ClinicalModel;
use amdsim_telemetry::{EventLogger, MetricsRecorder};
use chrono::NaiveDate;
use opentelemetry::KeyValue;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::audit::AuditLog;
use crate::engine::build_engine;
use crate::error::EngineError;
use crate::results::SimulationResults;

pub struct SimulationRunner {
    spec: Arc<ProtocolSpecification>,
    model: Arc<ClinicalModel>,
    audit: AuditLog,
    metrics: Option<MetricsRecorder>,
    start_date: NaiveDate,
}

impl SimulationRunner {
    /// Wires the protocol into the simulation components.
    pub fn new(spec: Arc<ProtocolSpecification>) -> Result<Self, EngineError> {
        let model = Arc::new(ClinicalModel::from_spec(&spec)?);
        let mut audit = AuditLog::new();
        let provenance = spec.provenance();
        audit.record(
            "protocol_loaded",
            json!({
                "name": spec.name(),
                "version": spec.version(),
                "author": spec.parameters().author,
                "protocol_type": spec.parameters().protocol_type,
                "checksum": provenance.checksum,
                "loaded_at": provenance.loaded_at_rfc3339(),
                "source": provenance.source,
            }),
        );

        let overlays = spec.clinical_improvements();
        if overlays.any_enabled() {
            audit.record(
                "clinical_improvements_enabled",
                json!({ "overlays": overlays.enabled_names() }),
            );
            info!(overlays = ?overlays.enabled_names(), "Clinical improvements enabled");
        }

        Ok(Self {
            spec,
            model,
            audit,
            metrics: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
        })
    }

    /// Records every completed run in `metrics`.
    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    /// Validates the parameters and runs the selected engine.
    pub fn run(
        &mut self,
        engine: EngineType,
        n_patients: i64,
        duration_years: f64,
        seed: u64,
    ) -> Result<SimulationResults, EngineError> {
        match RunParameters::new(engine, n_patients, duration_years, seed, self.start_date) {
            Ok(params) => self.run_with(params),
            Err(err) => {
                self.record_failure(&err.to_string(), seed);
                Err(err.into())
            }
        }
    }

    /// Same as [`SimulationRunner::run`] with the engine given by name.
    pub fn run_named(
        &mut self,
        engine: &str,
        n_patients: i64,
        duration_years: f64,
        seed: u64,
    ) -> Result<SimulationResults, EngineError> {
        match engine.parse::<EngineType>() {
            Ok(engine) => self.run(engine, n_patients, duration_years, seed),
            Err(err) => {
                self.record_failure(&err.to_string(), seed);
                Err(err.into())
            }
        }
    }

    #[instrument(skip(self), fields(protocol = %self.spec.name()))]
    pub fn run_with(&mut self, params: RunParameters) -> Result<SimulationResults, EngineError> {
        info!(
            engine = %params.engine,
            patients = params.n_patients,
            years = params.duration_years,
            seed = params.seed,
            "Starting simulation"
        );
        self.audit.record(
            "simulation_start",
            json!({
                "engine": params.engine,
                "n_patients": params.n_patients,
                "duration_years": params.duration_years,
                "horizon_days": params.horizon_days,
                "seed": params.seed,
                "start_date": params.start_date,
                "end_date": params.end_date(),
                "protocol_checksum": self.spec.checksum(),
            }),
        );

        let started = Instant::now();
        let mut engine = build_engine(self.model.clone(), params);
        let results = match engine.run(&mut self.audit) {
            Ok(results) => results,
            Err(err) => {
                error!(error = %err, "Simulation failed");
                self.record_failure(&err.to_string(), params.seed);
                return Err(err.into());
            }
        };
        let elapsed = started.elapsed();

        self.audit.record(
            "simulation_complete",
            json!({
                "engine": results.engine,
                "seed": results.seed,
                "patient_count": results.patient_count,
                "total_injections": results.total_injections,
                "total_visits": results.total_visits,
                "final_vision_mean": results.final_vision_mean,
                "final_vision_std": results.final_vision_std,
                "mean_vision_change": results.mean_vision_change,
                "discontinuation_rate": results.discontinuation_rate,
                "ever_discontinued": results.ever_discontinued,
                "retreatment_count": results.retreatment_count,
                "fingerprint": results.fingerprint(),
                "elapsed_ms": elapsed.as_millis() as u64,
            }),
        );
        EventLogger::log_event(
            "simulation_complete",
            vec![
                KeyValue::new("engine", params.engine.as_str()),
                KeyValue::new("seed", params.seed.to_string()),
                KeyValue::new("patients", results.patient_count as i64),
                KeyValue::new("injections", results.total_injections as i64),
                KeyValue::new("fingerprint", results.fingerprint().to_string()),
            ],
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_run(results.counts(), elapsed);
        }
        Ok(results)
    }

    fn record_failure(&mut self, reason: &str, seed: u64) {
        self.audit
            .record("simulation_failed", json!({ "error": reason, "seed": seed }));
    }

    pub fn spec(&self) -> &Arc<ProtocolSpecification> {
        &self.spec
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn into_audit(self) -> AuditLog {
        self.audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const PROTOCOL: &str = include_str!("../../protocols/treat_and_extend.yaml");

    #[traced_test]
    #[test]
    fn run_lifecycle_is_logged() {
        let spec = Arc::new(ProtocolSpecification::load_str(PROTOCOL, None).unwrap());
        let mut runner = SimulationRunner::new(spec).unwrap();
        runner.run(EngineType::Abs, 5, 0.5, 4).unwrap();
        assert!(logs_contain("Starting simulation"));
        assert!(logs_contain("Clinical improvements enabled"));
    }
}
