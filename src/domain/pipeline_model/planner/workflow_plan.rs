use std::collections::{BTreeMap, HashMap};

use crate::domain::pipeline_model::task::task::TaskStatus;
use crate::domain::pipeline_model::task::task_store::{TaskKey, TaskStore};
use crate::domain::pipeline_model::utils::id::{MachineId, ObservationId, TaskId};
use crate::domain::simulator::simulator::Tick;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    Scheduled,
    Delayed,
    Finished,
}

/// The tasks of one observation's workflow, ordered by estimated start.
///
/// `tasks` shrinks as tasks finish; the full set stays reachable through
/// [`WorkflowPlan::lookup`] so predecessors can still be resolved.
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    pub observation: ObservationId,

    tasks: Vec<TaskKey>,
    index: HashMap<TaskId, TaskKey>,

    pub est: Tick,
    pub eft: Tick,
    pub ast: Option<Tick>,
    pub aft: Option<Tick>,

    pub status: PlanStatus,

    /// Tasks handed to the cluster and not yet finished.
    pub allocations: BTreeMap<TaskKey, MachineId>,
}

impl WorkflowPlan {
    /// `tasks` must already be sorted by estimated start.
    pub fn new(observation: ObservationId, tasks: Vec<TaskKey>, index: HashMap<TaskId, TaskKey>, est: Tick, eft: Tick) -> Self {
        WorkflowPlan {
            observation,
            tasks,
            index,
            est,
            eft,
            ast: None,
            aft: None,
            status: PlanStatus::Scheduled,
            allocations: BTreeMap::new(),
        }
    }

    /// Remaining tasks in estimated-start order.
    pub fn task_keys(&self) -> &[TaskKey] {
        &self.tasks
    }

    pub fn lookup(&self, task: &TaskId) -> Option<TaskKey> {
        self.index.get(task).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.status == PlanStatus::Finished
    }

    /// Estimated makespan, or the actual one once the plan has finished.
    pub fn makespan(&self) -> Tick {
        match (self.ast, self.aft) {
            (Some(ast), Some(aft)) => aft - ast,
            _ => self.eft - self.est,
        }
    }

    pub fn record_allocation(&mut self, task: TaskKey, machine: MachineId) {
        self.allocations.insert(task, machine);
    }

    /// Drops finished tasks from the plan and returns them.
    ///
    /// Records the plan's actual start once any task has started, and marks
    /// the plan FINISHED with its actual finish once no task is left.
    pub fn remove_finished_tasks(&mut self, tasks: &TaskStore) -> Result<Vec<TaskKey>> {
        let mut finished = Vec::new();
        let mut remaining = Vec::with_capacity(self.tasks.len());
        for key in self.tasks.drain(..) {
            let task = tasks.get(key)?;
            if let Some(ast) = task.ast {
                self.ast = Some(self.ast.map_or(ast, |current| current.min(ast)));
            }
            if task.is_finished() {
                if let Some(aft) = task.aft {
                    self.aft = Some(self.aft.map_or(aft, |current| current.max(aft)));
                }
                self.allocations.remove(&key);
                finished.push(key);
            } else {
                remaining.push(key);
            }
        }
        self.tasks = remaining;

        if self.tasks.is_empty() && self.status != PlanStatus::Finished {
            self.status = PlanStatus::Finished;
            log::debug!("Plan of observation {} finished, makespan {}", self.observation, self.makespan());
        }
        Ok(finished)
    }

    /// True if every predecessor of `task` has finished.
    pub fn predecessors_finished(&self, task: TaskKey, tasks: &TaskStore) -> Result<bool> {
        for predecessor in &tasks.get(task)?.predecessors {
            let key = self.lookup(predecessor).ok_or_else(|| Error::UnknownTask(predecessor.to_string()))?;
            if !tasks.get(key)?.is_finished() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Unscheduled tasks whose predecessors have all finished, in estimated-start order.
    pub fn ready_tasks(&self, tasks: &TaskStore) -> Result<Vec<TaskKey>> {
        let mut ready = Vec::new();
        for &key in &self.tasks {
            if tasks.get(key)?.status() == TaskStatus::Unscheduled && self.predecessors_finished(key, tasks)? {
                ready.push(key);
            }
        }
        Ok(ready)
    }
}
