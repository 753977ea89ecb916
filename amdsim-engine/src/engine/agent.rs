//! Agent-based engine: a global day clock steps the whole population.

use std::collections::BTreeMap;
use std::sync::Arc;

use amdsim_config::{EngineType, RunParameters};
use amdsim_core::rng::RngStreams;
use amdsim_core::time::SimulationClock;
use amdsim_core::{PatientId, SimulationError};
use amdsim_simulator::ClinicalModel;
use tracing::{debug, instrument};

use super::{enroll, PatientSlot, SimulationEngine, VisitProcessor};
use crate::audit::AuditLog;
use crate::results::SimulationResults;

pub struct AgentEngine {
    processor: VisitProcessor,
    params: RunParameters,
}

impl AgentEngine {
    pub fn new(model: Arc<ClinicalModel>, params: RunParameters) -> Self {
        Self {
            processor: VisitProcessor::new(model),
            params,
        }
    }
}

impl SimulationEngine for AgentEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Abs
    }

    #[instrument(skip_all, fields(engine = "abs", seed = self.params.seed))]
    fn run(&mut self, audit: &mut AuditLog) -> Result<SimulationResults, SimulationError> {
        let streams = RngStreams::new(self.params.seed);
        let arrivals = enroll(&self.params, &streams, audit)?;
        let mut pending = arrivals.iter().peekable();
        let mut agents: BTreeMap<PatientId, PatientSlot> = BTreeMap::new();
        let mut clock = SimulationClock::new(self.params.start_date);
        let mut visits = 0u64;

        while clock.now_day() <= u64::from(self.params.horizon_days) {
            let today = clock.today();

            while let Some(arrival) = pending.next_if(|a| a.date == today) {
                let slot =
                    self.processor
                        .enroll(arrival.patient, today, streams.patient(arrival.patient));
                agents.insert(arrival.patient, slot);
            }

            for slot in agents.values_mut().filter(|slot| slot.next_due == today) {
                self.processor.step(slot, today)?;
                visits += 1;
            }

            clock.advance(1);
        }

        debug!(
            patients = agents.len(),
            steps = visits,
            days = clock.now_day(),
            "Agent simulation finished"
        );
        let patients = agents
            .into_iter()
            .map(|(id, slot)| (id, slot.patient))
            .collect();
        Ok(SimulationResults::new(
            EngineType::Abs,
            self.params.seed,
            patients,
        ))
    }
}
