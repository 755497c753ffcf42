use crate::domain::pipeline_model::observation::observation::ObservationStatus;
use crate::domain::pipeline_model::system::SystemModel;
use crate::domain::pipeline_model::utils::id::ObservationId;
use crate::domain::simulator::environment::Environment;
use crate::domain::simulator::process::{Process, Yield};
use crate::error::{Error, Result};

/// Daemon picking up cold-stored observations and starting their allocation loops.
#[derive(Debug, Default)]
pub struct ProcessingPoll;

impl Process for ProcessingPoll {
    fn name(&self) -> String {
        "ProcessingPoll".to_string()
    }

    fn resume(&mut self, env: &mut Environment, model: &mut SystemModel) -> Result<Yield> {
        while let Some(observation) = model.buffer.next_observation_for_processing() {
            if model.scheduler.is_queued(&observation) {
                continue;
            }
            log::info!("t={} observation {} queued for processing", env.now(), observation);
            model.scheduler.enqueue(observation.clone());
            env.spawn(Box::new(PlanExecution::new(observation)));
        }
        Ok(Yield::Sleep(1))
    }
}

/// Allocation loop of one observation's plan.
#[derive(Debug)]
pub struct PlanExecution {
    observation: ObservationId,
}

impl PlanExecution {
    pub fn new(observation: ObservationId) -> Self {
        PlanExecution { observation }
    }
}

impl Process for PlanExecution {
    fn name(&self) -> String {
        format!("PlanExecution({})", self.observation)
    }

    fn resume(&mut self, env: &mut Environment, model: &mut SystemModel) -> Result<Yield> {
        let observation = model
            .observations
            .get_mut(&self.observation)
            .ok_or_else(|| Error::UnknownObservation(self.observation.to_string()))?;

        let done = model.scheduler.allocate_tasks(env, &mut model.cluster, &mut model.buffer, &mut model.tasks, observation)?;
        if done { Ok(Yield::Done) } else { Ok(Yield::Sleep(1)) }
    }
}

/// Waits for an observation's ingest tasks, then closes the observation.
#[derive(Debug)]
pub struct IngestAllocation {
    observation: ObservationId,
}

impl IngestAllocation {
    pub fn new(observation: ObservationId) -> Self {
        IngestAllocation { observation }
    }
}

impl Process for IngestAllocation {
    fn name(&self) -> String {
        format!("IngestAllocation({})", self.observation)
    }

    fn resume(&mut self, env: &mut Environment, model: &mut SystemModel) -> Result<Yield> {
        if model.cluster.has_running_ingest(&self.observation, &model.tasks) || model.buffer.hot.is_streaming(&self.observation) {
            return Ok(Yield::Sleep(1));
        }

        let observation = model
            .observations
            .get_mut(&self.observation)
            .ok_or_else(|| Error::UnknownObservation(self.observation.to_string()))?;

        let cleaned = model.cluster.clean_up_ingest(&self.observation, &model.tasks)?;
        model.scheduler.finish_ingest(&self.observation);
        observation.status = ObservationStatus::Finished;

        log::info!(
            "t={} observation {} finished ingesting {} units on {} machines",
            env.now(),
            self.observation,
            observation.total_data_size,
            cleaned
        );
        Ok(Yield::Done)
    }
}
