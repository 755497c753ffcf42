use std::collections::{HashMap, VecDeque};
use std::str::FromStr;

use crate::api::simulation_dto::system_dto::SimulationDto;
use crate::domain::pipeline_model::buffer::buffer::Buffer;
use crate::domain::pipeline_model::buffer::buffer_processes::HotToColdTransfer;
use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::observation::observation::{Observation, ObservationStatus};
use crate::domain::pipeline_model::observation::pipeline::{Pipeline, PipelineTable};
use crate::domain::pipeline_model::planner::planner::Planner;
use crate::domain::pipeline_model::planner::static_solution::PrecomputedScheduler;
use crate::domain::pipeline_model::scheduler::policy::policy_type::PolicyType;
use crate::domain::pipeline_model::scheduler::scheduler::Scheduler;
use crate::domain::pipeline_model::scheduler::scheduler_processes::ProcessingPoll;
use crate::domain::pipeline_model::task::delay_model::DelayModel;
use crate::domain::pipeline_model::task::task_store::TaskStore;
use crate::domain::pipeline_model::utils::id::ObservationId;
use crate::domain::pipeline_model::utils::task_time_table::TaskTimeRecord;
use crate::domain::simulator::environment::Environment;
use crate::domain::simulator::simulator::{Simulator, Tick};
use crate::error::{Error, Result};

/// Everything the processes of a run share. Owned by the [`Simulator`].
#[derive(Debug)]
pub struct SystemModel {
    pub cluster: Cluster,
    pub buffer: Buffer,
    pub scheduler: Scheduler,
    pub planner: Planner,
    pub tasks: TaskStore,
    pub observations: HashMap<ObservationId, Observation>,
    pub pipelines: PipelineTable,
}

impl SystemModel {
    pub fn new(cluster: Cluster, buffer: Buffer, scheduler: Scheduler, planner: Planner, pipelines: PipelineTable) -> Self {
        SystemModel { cluster, buffer, scheduler, planner, tasks: TaskStore::new(), observations: HashMap::new(), pipelines }
    }

    pub fn add_observation(&mut self, observation: Observation) -> Result<()> {
        if self.observations.contains_key(&observation.id) {
            return Err(Error::ModelConstructionError(format!("observation {} is defined twice", observation.id)));
        }
        self.observations.insert(observation.id.clone(), observation);
        Ok(())
    }

    pub fn observation(&self, observation: &ObservationId) -> Option<&Observation> {
        self.observations.get(observation)
    }

    /// Admission gate for one observation. Side-effect free.
    pub fn check_ingest_capacity(&self, observation: &ObservationId) -> Result<bool> {
        let observation = self.observations.get(observation).ok_or_else(|| Error::UnknownObservation(observation.to_string()))?;
        self.scheduler.check_ingest_capacity(observation, &self.pipelines, &self.cluster, &self.buffer)
    }

    /// Admits `observation` at the current tick if there is room for it.
    ///
    /// On success the observation is RUNNING, planned and ingesting. Returns
    /// `false` without touching anything when capacity is short.
    pub fn admit(&mut self, env: &mut Environment, observation: &ObservationId) -> Result<bool> {
        let observation = self.observations.get_mut(observation).ok_or_else(|| Error::UnknownObservation(observation.to_string()))?;
        if observation.status != ObservationStatus::Waiting {
            log::warn!("t={} observation {} was already admitted", env.now(), observation.id);
            return Ok(false);
        }
        if !self.scheduler.check_ingest_capacity(observation, &self.pipelines, &self.cluster, &self.buffer)? {
            log::debug!("t={} no capacity for observation {} yet", env.now(), observation.id);
            return Ok(false);
        }

        observation.start(env.now())?;
        self.planner.run(observation, &self.buffer, &self.cluster, &mut self.tasks)?;
        self.scheduler
            .allocate_ingest(env, &mut self.cluster, &mut self.buffer, &mut self.tasks, observation, &self.pipelines)?;

        log::info!("t={} admitted observation {}", env.now(), observation.id);
        Ok(true)
    }

    /// Buffer empty, cluster idle and no plan or ingest left in the scheduler.
    pub fn is_finished(&self) -> bool {
        self.buffer.is_empty() && self.cluster.is_idle() && self.scheduler.is_idle()
    }
}

/// A run: the engine, its background processes and the observations still
/// waiting for admission.
///
/// Waiting observations are admitted first come, first served: a later one
/// never overtakes an earlier one that does not fit yet.
#[derive(Debug)]
pub struct Simulation {
    simulator: Simulator,
    pending: VecDeque<ObservationId>,
}

impl Simulation {
    pub fn new(model: SystemModel) -> Self {
        let mut simulator = Simulator::new(model);
        simulator.spawn(Box::new(HotToColdTransfer));
        simulator.spawn(Box::new(ProcessingPoll));
        Simulation { simulator, pending: VecDeque::new() }
    }

    pub fn now(&self) -> Tick {
        self.simulator.now()
    }

    pub fn model(&self) -> &SystemModel {
        self.simulator.model()
    }

    pub fn model_mut(&mut self) -> &mut SystemModel {
        self.simulator.model_mut()
    }

    pub fn pending_observations(&self) -> Vec<ObservationId> {
        self.pending.iter().cloned().collect()
    }

    pub fn add_observation(&mut self, observation: Observation) -> Result<()> {
        let id = observation.id.clone();
        self.simulator.model_mut().add_observation(observation)?;
        self.pending.push_back(id);
        Ok(())
    }

    /// Tries to admit the named observation at the current tick.
    pub fn try_admit(&mut self, name: &str) -> Result<bool> {
        let id = ObservationId::new(name);
        let admitted = self.simulator.call(|env, model| model.admit(env, &id))?;
        if admitted {
            self.pending.retain(|o| o != &id);
        }
        Ok(admitted)
    }

    fn admit_pending(&mut self) -> Result<()> {
        while let Some(next) = self.pending.front().cloned() {
            if !self.try_admit(next.as_str())? {
                break;
            }
        }
        Ok(())
    }

    pub fn advance(&mut self, ticks: Tick) -> Result<()> {
        self.simulator.advance(ticks)
    }

    pub fn run_until(&mut self, until: Tick) -> Result<()> {
        self.simulator.run_until(until)
    }

    /// Admits waiting observations and advances tick by tick until the run
    /// has finished or `budget` ticks have passed. Returns whether it finished.
    ///
    /// A run that ran out of budget can be continued with another call.
    pub fn run(&mut self, budget: Tick) -> Result<bool> {
        let deadline = self.now() + budget;
        loop {
            self.admit_pending()?;
            if self.is_finished() {
                log::info!("t={} simulation finished", self.now());
                return Ok(true);
            }
            if self.now() >= deadline {
                log::info!("t={} tick budget exhausted, {} observations waiting", self.now(), self.pending.len());
                return Ok(false);
            }
            self.simulator.advance(1)?;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && self.simulator.model().is_finished()
    }

    pub fn finished_task_time_data(&self) -> Result<Vec<TaskTimeRecord>> {
        let model = self.simulator.model();
        model.cluster.finished_task_time_data(&model.tasks)
    }
}

impl TryFrom<SimulationDto> for Simulation {
    type Error = Error;

    fn try_from(dto: SimulationDto) -> Result<Simulation> {
        let cluster = Cluster::try_from(dto.cluster)?;
        let buffer = Buffer::try_from(dto.buffer)?;

        let policy_type = PolicyType::from_str(&dto.scheduler.policy)?;
        let policy = PolicyType::get_instance(policy_type, dto.scheduler.batch_size);
        let scheduler = Scheduler::new(policy, dto.scheduler.max_ingest_resources);

        let delay_model = dto.delay_model.map(DelayModel::try_from).transpose()?;
        let planner = Planner::new(Box::new(PrecomputedScheduler), delay_model);

        let pipelines = dto.pipelines.into_iter().map(|p| (p.name.clone(), Pipeline::from(p))).collect();

        let mut simulation = Simulation::new(SystemModel::new(cluster, buffer, scheduler, planner, pipelines));
        for observation in dto.observations {
            simulation.add_observation(Observation::try_from(observation)?)?;
        }
        Ok(simulation)
    }
}
