//! ## amdsim-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry attributes**
//!
//! `RUST_LOG` selects the filter; `info` is the default.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    fn filter() -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Installs a human-readable subscriber.
    pub fn init() -> Result<(), InitError> {
        fmt()
            .with_env_filter(Self::filter())
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
    }

    /// Installs a JSON-lines subscriber.
    pub fn init_json() -> Result<(), InitError> {
        fmt()
            .json()
            .with_env_filter(Self::filter())
            .with_current_span(true)
            .try_init()
    }

    /// Emits a lifecycle event with OpenTelemetry-style attributes.
    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "simulation_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _entered = span.enter();
        let attributes: Vec<String> = metadata
            .iter()
            .map(|kv| format!("{}={}", kv.key, kv.value))
            .collect();
        tracing::info!(
            event_type,
            attributes = %attributes.join(" "),
            "Simulation event recorded"
        );
    }
}
