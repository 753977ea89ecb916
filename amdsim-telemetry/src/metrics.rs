//! ## amdsim-telemetry::metrics
//! **Prometheus counters for completed runs**

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

/// Totals of one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub patients: u64,
    pub visits: u64,
    pub injections: u64,
    pub discontinuations: u64,
    pub retreatments: u64,
}

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub runs: IntCounter,
    pub patients: IntCounter,
    pub visits: IntCounter,
    pub injections: IntCounter,
    pub discontinuations: IntCounter,
    pub retreatments: IntCounter,
    pub run_duration: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let runs = counter("amdsim_runs_total", "Completed simulation runs")?;
        let patients = counter("amdsim_patients_total", "Simulated patients")?;
        let visits = counter("amdsim_visits_total", "Recorded visits")?;
        let injections = counter("amdsim_injections_total", "Injections given")?;
        let discontinuations = counter(
            "amdsim_discontinuations_total",
            "Patients discontinued at end of run",
        )?;
        let retreatments = counter("amdsim_retreatments_total", "Retreatments")?;

        let run_duration = Histogram::with_opts(
            HistogramOpts::new("amdsim_run_duration_seconds", "Wall-clock time per run")
                .buckets(vec![0.01, 0.1, 1.0, 10.0, 60.0, 600.0]),
        )?;
        registry.register(Box::new(run_duration.clone()))?;

        Ok(Self {
            registry,
            runs,
            patients,
            visits,
            injections,
            discontinuations,
            retreatments,
            run_duration,
        })
    }

    pub fn record_run(&self, counts: RunCounts, elapsed: Duration) {
        self.runs.inc();
        self.patients.inc_by(counts.patients);
        self.visits.inc_by(counts.visits);
        self.injections.inc_by(counts.injections);
        self.discontinuations.inc_by(counts.discontinuations);
        self.retreatments.inc_by(counts.retreatments);
        self.run_duration.observe(elapsed.as_secs_f64());
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
