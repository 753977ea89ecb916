//! Discrete-event engine: jumps between scheduled patient events.

use std::collections::BTreeMap;
use std::sync::Arc;

use amdsim_config::{EngineType, RunParameters};
use amdsim_core::events::{EventKind, EventQueue, ScheduledEvent};
use amdsim_core::rng::RngStreams;
use amdsim_core::{InvariantViolation, PatientId, SimulationError};
use amdsim_simulator::ClinicalModel;
use tracing::{debug, instrument};

use super::{enroll, PatientSlot, SimulationEngine, VisitProcessor};
use crate::audit::AuditLog;
use crate::results::SimulationResults;

pub struct EventEngine {
    processor: VisitProcessor,
    params: RunParameters,
}

impl EventEngine {
    pub fn new(model: Arc<ClinicalModel>, params: RunParameters) -> Self {
        Self {
            processor: VisitProcessor::new(model),
            params,
        }
    }
}

fn schedule(queue: &mut EventQueue, event: ScheduledEvent) -> Result<(), InvariantViolation> {
    queue
        .push(event)
        .map_err(|err| InvariantViolation::new(event.patient, event.date, err.to_string()))
}

impl SimulationEngine for EventEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Des
    }

    #[instrument(skip_all, fields(engine = "des", seed = self.params.seed))]
    fn run(&mut self, audit: &mut AuditLog) -> Result<SimulationResults, SimulationError> {
        let streams = RngStreams::new(self.params.seed);
        let end = self.params.end_date();
        let arrivals = enroll(&self.params, &streams, audit)?;

        let mut queue = EventQueue::with_capacity(arrivals.len() * 2);
        for arrival in &arrivals {
            schedule(&mut queue, ScheduledEvent::arrival(arrival.date, arrival.patient))?;
        }

        let mut patients: BTreeMap<PatientId, PatientSlot> = BTreeMap::new();
        while let Some(event) = queue.pop() {
            if event.date > end {
                break;
            }
            match event.kind {
                EventKind::Arrival => {
                    let slot = self.processor.enroll(
                        event.patient,
                        event.date,
                        streams.patient(event.patient),
                    );
                    schedule(&mut queue, ScheduledEvent::visit(slot.next_due, event.patient))?;
                    patients.insert(event.patient, slot);
                }
                EventKind::VisitDue => {
                    let Some(slot) = patients.get_mut(&event.patient) else {
                        return Err(InvariantViolation::new(
                            event.patient,
                            event.date,
                            "visit for a patient that never arrived",
                        )
                        .into());
                    };
                    let next = self.processor.step(slot, event.date)?;
                    if next <= end {
                        schedule(&mut queue, ScheduledEvent::visit(next, event.patient))?;
                    }
                }
            }
        }

        debug!(
            patients = patients.len(),
            events = queue.processed(),
            "Event simulation finished"
        );
        let patients = patients
            .into_iter()
            .map(|(id, slot)| (id, slot.patient))
            .collect();
        Ok(SimulationResults::new(
            EngineType::Des,
            self.params.seed,
            patients,
        ))
    }
}
