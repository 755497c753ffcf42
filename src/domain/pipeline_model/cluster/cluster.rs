use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::api::simulation_dto::system_dto::ClusterDto;
use crate::domain::pipeline_model::cluster::task_execution::{PoolOrigin, TaskExecution};
use crate::domain::pipeline_model::observation::observation::Observation;
use crate::domain::pipeline_model::resource::machine::Machine;
use crate::domain::pipeline_model::task::task::Task;
use crate::domain::pipeline_model::task::task_store::{TaskKey, TaskStore};
use crate::domain::pipeline_model::utils::id::{MachineId, ObservationId, TaskId};
use crate::domain::pipeline_model::utils::task_time_table::TaskTimeRecord;
use crate::domain::simulator::environment::Environment;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct RunningTask {
    key: TaskKey,
    machine: MachineId,
}

/// Owns every machine and partitions them into disjoint pools.
///
/// Only the methods below move machines between pools. Each of them leaves
/// every machine in exactly one of `available`, `occupied`, `ingest` or one
/// observation's `idle` reservation.
#[derive(Debug)]
pub struct Cluster {
    machines: BTreeMap<MachineId, Machine>,

    available: BTreeSet<MachineId>,
    occupied: BTreeSet<MachineId>,
    ingest: BTreeSet<MachineId>,
    idle: BTreeMap<ObservationId, BTreeSet<MachineId>>,

    /// Machines granted per batch reservation, whether idle or busy.
    reservations: HashMap<ObservationId, usize>,

    running: Vec<RunningTask>,
    finished: Vec<TaskKey>,

    ingest_tasks: HashMap<ObservationId, Vec<TaskKey>>,
}

impl Cluster {
    pub fn new(machines: Vec<Machine>) -> Result<Cluster> {
        let mut by_id = BTreeMap::new();
        for machine in machines {
            let id = machine.id.clone();
            if by_id.insert(id.clone(), machine).is_some() {
                return Err(Error::ModelConstructionError(format!("machine {} is defined twice", id)));
            }
        }
        let available = by_id.keys().cloned().collect();

        Ok(Cluster {
            machines: by_id,
            available,
            occupied: BTreeSet::new(),
            ingest: BTreeSet::new(),
            idle: BTreeMap::new(),
            reservations: HashMap::new(),
            running: Vec::new(),
            finished: Vec::new(),
            ingest_tasks: HashMap::new(),
        })
    }

    //-----------------
    // --- Queries ---
    //-----------------

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn get_machine(&self, machine: &MachineId) -> Option<&Machine> {
        self.machines.get(machine)
    }

    pub fn has_machine(&self, machine: &MachineId) -> bool {
        self.machines.contains_key(machine)
    }

    pub fn get_available_resources(&self) -> Vec<MachineId> {
        self.available.iter().cloned().collect()
    }

    pub fn get_idle_resources(&self, observation: &ObservationId) -> Vec<MachineId> {
        self.idle.get(observation).map(|pool| pool.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn get_ingest_resources(&self) -> Vec<MachineId> {
        self.ingest.iter().cloned().collect()
    }

    pub fn get_occupied_resources(&self) -> Vec<MachineId> {
        self.occupied.iter().cloned().collect()
    }

    pub fn is_available(&self, machine: &MachineId) -> bool {
        self.available.contains(machine)
    }

    pub fn is_occupied(&self, machine: &MachineId) -> bool {
        self.occupied.contains(machine)
    }

    /// True if `machine` could be handed to a task of `observation` right now.
    pub fn can_allocate(&self, machine: &MachineId, observation: &ObservationId) -> bool {
        self.available.contains(machine) || self.idle.get(observation).is_some_and(|pool| pool.contains(machine))
    }

    /// Machines granted to `observation`'s batch reservation, idle or busy.
    pub fn reserved_count(&self, observation: &ObservationId) -> usize {
        self.reservations.get(observation).copied().unwrap_or(0)
    }

    pub fn running_tasks(&self) -> Vec<TaskKey> {
        self.running.iter().map(|r| r.key).collect()
    }

    pub fn finished_tasks(&self) -> &[TaskKey] {
        &self.finished
    }

    pub fn has_running_ingest(&self, observation: &ObservationId, tasks: &TaskStore) -> bool {
        self.ingest_tasks
            .get(observation)
            .is_some_and(|keys| keys.iter().any(|key| tasks.get(*key).map(|t| !t.is_finished()).unwrap_or(false)))
    }

    /// No task is running and no machine is occupied or serving ingest.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.occupied.is_empty() && self.ingest.is_empty()
    }

    /// Checks that the pools partition the machine set.
    pub fn pool_partition_holds(&self) -> bool {
        let pooled = self.available.len() + self.occupied.len() + self.ingest.len() + self.idle.values().map(|p| p.len()).sum::<usize>();
        if pooled != self.machines.len() {
            return false;
        }

        let mut seen = BTreeSet::new();
        let all = self.available.iter().chain(self.occupied.iter()).chain(self.ingest.iter()).chain(self.idle.values().flatten());
        for machine in all {
            if !self.machines.contains_key(machine) || !seen.insert(machine) {
                return false;
            }
        }
        true
    }

    //--------------------------
    // --- Ingest admission ---
    //--------------------------

    pub fn check_ingest_capacity(&self, pipeline_demand: usize, max_ingest_resources: usize) -> bool {
        self.available.len() >= pipeline_demand && self.ingest.len() + pipeline_demand <= max_ingest_resources
    }

    /// Moves `demand` machines into the ingest pool and starts one ingest task on each.
    ///
    /// Callers must have passed [`Cluster::check_ingest_capacity`] first;
    /// asking for more machines than are available is a sequencing bug.
    pub fn provision_ingest_resources(
        &mut self,
        env: &mut Environment,
        tasks: &mut TaskStore,
        demand: usize,
        observation: &Observation,
    ) -> Result<Vec<TaskKey>> {
        if demand > self.available.len() {
            return Err(Error::InsufficientMachines { requested: demand, available: self.available.len() });
        }

        let admitted_at = observation.actual_start_time.ok_or_else(|| Error::ObservationNotAdmitted(observation.id.to_string()))?;
        let machines: Vec<MachineId> = self.available.iter().take(demand).cloned().collect();

        let mut keys = Vec::with_capacity(demand);
        for (index, machine) in machines.into_iter().enumerate() {
            self.available.remove(&machine);
            self.ingest.insert(machine.clone());

            let id = TaskId::ingest(observation.id.clone(), admitted_at, index);
            let task = Task::new(id, observation.duration, admitted_at, admitted_at + observation.duration);
            let key = tasks.add(task);

            self.allocate_task_to_cluster(env, tasks, key, &machine, &observation.id, true)?;
            keys.push(key);
        }

        log::info!("t={} provisioned {} ingest machines for observation {}", env.now(), demand, observation.id);
        self.ingest_tasks.entry(observation.id.clone()).or_default().extend(keys.iter().copied());
        Ok(keys)
    }

    /// Drops the bookkeeping of a completed ingest. Fails if any ingest task is still running.
    pub fn clean_up_ingest(&mut self, observation: &ObservationId, tasks: &TaskStore) -> Result<usize> {
        if self.has_running_ingest(observation, tasks) {
            return Err(Error::IngestStillRunning(observation.to_string()));
        }
        Ok(self.ingest_tasks.remove(observation).map(|keys| keys.len()).unwrap_or(0))
    }

    //------------------------
    // --- Task execution ---
    //------------------------

    /// Binds `task` to `machine` and starts executing it.
    ///
    /// The machine is taken from `available` or from `observation`'s idle
    /// reservation and moved to `occupied` (or to `ingest`). Ingest tasks may
    /// also run on a machine already moved to the ingest pool, provided no
    /// other task runs there. Anything else means two parties believe they
    /// own the machine and is reported as [`Error::MachineNotAllocatable`].
    pub fn allocate_task_to_cluster(
        &mut self,
        env: &mut Environment,
        tasks: &mut TaskStore,
        task: TaskKey,
        machine: &MachineId,
        observation: &ObservationId,
        ingest: bool,
    ) -> Result<()> {
        let task_ref = tasks.get_mut(task)?;

        let origin = if self.available.contains(machine) {
            self.available.remove(machine);
            if ingest { PoolOrigin::Ingest } else { PoolOrigin::Available }
        } else if self.idle.get(observation).is_some_and(|pool| pool.contains(machine)) {
            if let Some(pool) = self.idle.get_mut(observation) {
                pool.remove(machine);
            }
            if ingest { PoolOrigin::Ingest } else { PoolOrigin::Idle(observation.clone()) }
        } else if ingest && self.ingest.contains(machine) && !self.running.iter().any(|r| &r.machine == machine) {
            PoolOrigin::Ingest
        } else {
            return Err(Error::MachineNotAllocatable { machine: machine.to_string(), task: task_ref.id.to_string() });
        };

        if ingest {
            self.ingest.insert(machine.clone());
        } else {
            self.occupied.insert(machine.clone());
        }

        task_ref.schedule(machine.clone())?;
        log::debug!("t={} task {} allocated to {} (from {:?})", env.now(), task_ref.id, machine, origin);

        self.running.push(RunningTask { key: task, machine: machine.clone() });
        env.spawn(Box::new(TaskExecution::new(task, machine.clone(), origin)));
        Ok(())
    }

    /// Called by a task's execution once it has finished: records the task and
    /// hands the machine back to the pool it was drawn from.
    pub(crate) fn finish_task_execution(&mut self, task: TaskKey, machine: &MachineId, origin: &PoolOrigin) -> Result<()> {
        let position = self
            .running
            .iter()
            .position(|r| r.key == task)
            .ok_or_else(|| Error::UnknownTask(format!("{:?} is not running on {}", task, machine)))?;
        self.running.remove(position);
        self.finished.push(task);

        let released = match origin {
            PoolOrigin::Ingest => self.ingest.remove(machine),
            PoolOrigin::Available | PoolOrigin::Idle(_) => self.occupied.remove(machine),
        };
        if !released {
            return Err(Error::MachineNotAllocatable { machine: machine.to_string(), task: format!("{:?} (release)", task) });
        }

        match origin {
            PoolOrigin::Idle(observation) if self.reservations.contains_key(observation) => {
                self.idle.entry(observation.clone()).or_default().insert(machine.clone());
            }
            _ => {
                self.available.insert(machine.clone());
            }
        }
        Ok(())
    }

    //---------------------------
    // --- Batch reservations ---
    //---------------------------

    /// Reserves up to `size` available machines for `observation`.
    ///
    /// Returns how many were granted, which may be fewer than requested.
    pub fn provision_batch_resources(&mut self, size: usize, observation: &ObservationId) -> usize {
        let granted: Vec<MachineId> = self.available.iter().take(size).cloned().collect();
        if granted.is_empty() {
            return 0;
        }

        let pool = self.idle.entry(observation.clone()).or_default();
        for machine in &granted {
            self.available.remove(machine);
            pool.insert(machine.clone());
        }
        *self.reservations.entry(observation.clone()).or_insert(0) += granted.len();

        log::debug!("Reserved {} of {} requested machines for observation {}", granted.len(), size, observation);
        granted.len()
    }

    /// Returns every idle machine reserved for `observation` and drops the
    /// reservation. Machines still busy go to `available` once their task finishes.
    pub fn release_batch_resources(&mut self, observation: &ObservationId) -> usize {
        self.reservations.remove(observation);
        let Some(pool) = self.idle.remove(observation) else {
            return 0;
        };
        let released = pool.len();
        self.available.extend(pool);
        released
    }

    //---------------------
    // --- Reporting ---
    //---------------------

    /// est/eft/ast/aft of every finished task, in completion order.
    pub fn finished_task_time_data(&self, tasks: &TaskStore) -> Result<Vec<TaskTimeRecord>> {
        self.finished.iter().map(|key| tasks.get(*key).map(TaskTimeRecord::from)).collect()
    }
}

impl TryFrom<ClusterDto> for Cluster {
    type Error = Error;

    fn try_from(dto: ClusterDto) -> Result<Cluster> {
        let mut machines: Vec<Machine> = dto.machines.into_iter().map(Machine::from).collect();
        machines.extend((0..dto.homogeneous_machines).map(|i| Machine::homogeneous(format!("machine_{}", i))));
        if machines.is_empty() {
            return Err(Error::ModelConstructionError("cluster has no machines".to_string()));
        }
        Cluster::new(machines)
    }
}
