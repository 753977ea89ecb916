//! Append-only audit trail of a runner's lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &str, payload: Value) {
        debug!(event, "Audit entry recorded");
        self.entries.push(AuditEntry {
            event: event.to_string(),
            timestamp: Utc::now(),
            payload,
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries with the given event name, oldest first.
    pub fn events<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a AuditEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.event == event)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty-printed JSON document of every entry.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_are_appended_in_order() {
        let mut log = AuditLog::new();
        log.record("protocol_loaded", json!({"name": "T&E"}));
        log.record("simulation_start", json!({"seed": 42}));
        log.record("simulation_start", json!({"seed": 43}));

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0].event, "protocol_loaded");
        assert_eq!(log.events("simulation_start").count(), 2);
        assert!(log.entries()[1].timestamp <= log.entries()[2].timestamp);
    }

    #[test]
    fn exports_json_document() {
        let mut log = AuditLog::new();
        log.record("simulation_complete", json!({"patients": 10}));
        let text = log.to_json().unwrap();
        let parsed: Vec<AuditEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, log.entries());
        assert_eq!(parsed[0].payload["patients"], 10);
    }
}
