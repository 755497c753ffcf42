use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::domain::pipeline_model::buffer::buffer::Buffer;
use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::observation::observation::Observation;
use crate::domain::pipeline_model::observation::pipeline::PipelineTable;
use crate::domain::pipeline_model::planner::workflow_plan::PlanStatus;
use crate::domain::pipeline_model::scheduler::policy::allocation_policy::AllocationPolicy;
use crate::domain::pipeline_model::scheduler::scheduler_processes::IngestAllocation;
use crate::domain::pipeline_model::task::task_store::{TaskKey, TaskStore};
use crate::domain::pipeline_model::utils::id::{MachineId, ObservationId};
use crate::domain::simulator::environment::Environment;
use crate::domain::simulator::simulator::Tick;
use crate::error::{Error, Result};

/// Timing drift of the whole run. Once DELAYED it stays DELAYED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    OnTime,
    Delayed,
}

/// Dynamic allocation loop: gates ingest admission and drives every queued
/// plan onto the cluster, one tick at a time.
#[derive(Debug)]
pub struct Scheduler {
    policy: Box<dyn AllocationPolicy>,

    pub status: ScheduleStatus,
    /// Sum of the delays of every finished task.
    pub delay_offset: Tick,

    max_ingest_resources: usize,
    ingest_provisions: usize,

    observation_queue: VecDeque<ObservationId>,
    task_pools: HashMap<ObservationId, VecDeque<TaskKey>>,

    /// Machines handed out during `allocation_tick`.
    allocated_this_tick: BTreeSet<MachineId>,
    allocation_tick: Option<Tick>,
}

impl Scheduler {
    pub fn new(policy: Box<dyn AllocationPolicy>, max_ingest_resources: usize) -> Self {
        Scheduler {
            policy,
            status: ScheduleStatus::OnTime,
            delay_offset: 0,
            max_ingest_resources,
            ingest_provisions: 0,
            observation_queue: VecDeque::new(),
            task_pools: HashMap::new(),
            allocated_this_tick: BTreeSet::new(),
            allocation_tick: None,
        }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn max_ingest_resources(&self) -> usize {
        self.max_ingest_resources
    }

    /// Ingests started and not yet cleaned up.
    pub fn ingest_provisions(&self) -> usize {
        self.ingest_provisions
    }

    pub fn queued_observations(&self) -> Vec<ObservationId> {
        self.observation_queue.iter().cloned().collect()
    }

    pub fn is_queued(&self, observation: &ObservationId) -> bool {
        self.observation_queue.contains(observation)
    }

    pub fn enqueue(&mut self, observation: ObservationId) {
        if !self.is_queued(&observation) {
            self.observation_queue.push_back(observation);
        }
    }

    pub fn dequeue(&mut self, observation: &ObservationId) -> bool {
        self.task_pools.remove(observation);
        match self.observation_queue.iter().position(|o| o == observation) {
            Some(position) => {
                self.observation_queue.remove(position);
                true
            }
            None => false,
        }
    }

    /// No plan queued and no ingest running.
    pub fn is_idle(&self) -> bool {
        self.observation_queue.is_empty() && self.ingest_provisions == 0
    }

    //--------------------------
    // --- Ingest admission ---
    //--------------------------

    /// Admission gate: enough machines for the pipeline's ingest and room in
    /// both buffer tiers for the whole observation.
    pub fn check_ingest_capacity(&self, observation: &Observation, pipelines: &PipelineTable, cluster: &Cluster, buffer: &Buffer) -> Result<bool> {
        let pipeline = pipelines.get(&observation.pipeline).ok_or_else(|| Error::UnknownPipeline(observation.pipeline.clone()))?;
        Ok(cluster.check_ingest_capacity(pipeline.ingest_demand, self.max_ingest_resources) && buffer.check_buffer_capacity(observation))
    }

    /// Starts the ingest of an admitted observation: provisions the ingest
    /// machines, opens the data stream and spawns the process that waits for
    /// both to complete.
    pub fn allocate_ingest(
        &mut self,
        env: &mut Environment,
        cluster: &mut Cluster,
        buffer: &mut Buffer,
        tasks: &mut TaskStore,
        observation: &Observation,
        pipelines: &PipelineTable,
    ) -> Result<()> {
        let pipeline = pipelines.get(&observation.pipeline).ok_or_else(|| Error::UnknownPipeline(observation.pipeline.clone()))?;

        cluster.provision_ingest_resources(env, tasks, pipeline.ingest_demand, observation)?;
        let stream = buffer.ingest_data_stream(observation)?;
        env.spawn(Box::new(stream));

        self.ingest_provisions += 1;
        env.spawn(Box::new(IngestAllocation::new(observation.id.clone())));
        Ok(())
    }

    /// Called once the ingest of `observation` has completed.
    pub fn finish_ingest(&mut self, observation: &ObservationId) {
        self.ingest_provisions = self.ingest_provisions.saturating_sub(1);
        log::debug!("Ingest of observation {} completed, {} still running", observation, self.ingest_provisions);
    }

    //-------------------------
    // --- Task allocation ---
    //-------------------------

    /// One tick of `observation`'s allocation loop. Returns `true` once the
    /// plan has finished and its resources have been released.
    pub fn allocate_tasks(
        &mut self,
        env: &mut Environment,
        cluster: &mut Cluster,
        buffer: &mut Buffer,
        tasks: &mut TaskStore,
        observation: &mut Observation,
    ) -> Result<bool> {
        let now = env.now();
        let plan = observation.plan.as_mut().ok_or_else(|| Error::ObservationNotPlanned(observation.id.to_string()))?;

        for key in plan.remove_finished_tasks(tasks)? {
            let task = tasks.get(key)?;
            if task.delayed {
                if self.status == ScheduleStatus::OnTime {
                    log::info!("t={} schedule delayed by task {}", now, task.id);
                }
                self.status = ScheduleStatus::Delayed;
                self.delay_offset += task.delay;
            }
        }

        if plan.is_finished() {
            buffer.mark_observation_finished(&observation.id);
            let released = cluster.release_batch_resources(&observation.id);
            self.dequeue(&observation.id);
            log::info!(
                "t={} observation {} processed, makespan {}, {} reserved machines released",
                now,
                observation.id,
                plan.makespan(),
                released
            );
            return Ok(true);
        }

        let pool = self.task_pools.entry(observation.id.clone()).or_default();
        let outcome = self.policy.run(cluster, now, plan, tasks, &plan.allocations, pool)?;
        if outcome.status == PlanStatus::Delayed && plan.status == PlanStatus::Scheduled {
            log::debug!("t={} plan of observation {} is running late", now, observation.id);
            plan.status = PlanStatus::Delayed;
        }

        if self.allocation_tick != Some(now) {
            self.allocation_tick = Some(now);
            self.allocated_this_tick.clear();
        }

        for (key, machine) in outcome.allocations {
            if self.allocated_this_tick.contains(&machine) || cluster.is_occupied(&machine) || !cluster.can_allocate(&machine, &observation.id) {
                log::debug!("t={} machine {} already taken this tick, skipping", now, machine);
                continue;
            }
            if !plan.predecessors_finished(key, tasks)? {
                log::debug!("t={} policy {} proposed a task with running predecessors, skipping", now, self.policy.name());
                continue;
            }

            cluster.allocate_task_to_cluster(env, tasks, key, &machine, &observation.id, false)?;
            plan.record_allocation(key, machine.clone());
            self.allocated_this_tick.insert(machine);
        }
        Ok(false)
    }
}
