use std::collections::{BTreeMap, VecDeque};

use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::planner::workflow_plan::WorkflowPlan;
use crate::domain::pipeline_model::scheduler::policy::allocation_policy::{AllocationPolicy, PolicyOutcome, busy_machines, drift_status};
use crate::domain::pipeline_model::task::task::TaskStatus;
use crate::domain::pipeline_model::task::task_store::{TaskKey, TaskStore};
use crate::domain::pipeline_model::utils::id::MachineId;
use crate::domain::simulator::simulator::Tick;
use crate::error::Result;

/// Reserves up to `batch_size` machines for the observation and works off a
/// FIFO pool of ready tasks on them.
///
/// The reservation is topped up whenever machines free up elsewhere and is
/// released by the scheduler once the plan has finished.
#[derive(Debug)]
pub struct BatchPolicy {
    batch_size: usize,
}

impl BatchPolicy {
    pub fn new(batch_size: usize) -> Self {
        BatchPolicy { batch_size: batch_size.max(1) }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl AllocationPolicy for BatchPolicy {
    fn name(&self) -> &str {
        "batch"
    }

    fn run(
        &self,
        cluster: &mut Cluster,
        now: Tick,
        plan: &WorkflowPlan,
        tasks: &TaskStore,
        existing: &BTreeMap<TaskKey, MachineId>,
        task_pool: &mut VecDeque<TaskKey>,
    ) -> Result<PolicyOutcome> {
        let mut unscheduled = false;
        for key in plan.task_keys() {
            if tasks.get(*key)?.status() == TaskStatus::Unscheduled {
                unscheduled = true;
                break;
            }
        }

        let reserved = cluster.reserved_count(&plan.observation);
        if unscheduled && reserved < self.batch_size {
            cluster.provision_batch_resources(self.batch_size - reserved, &plan.observation);
        }

        let ready = plan.ready_tasks(tasks)?;
        let status = drift_status(now, plan, &ready, tasks)?;

        // Tasks skipped by the scheduler last tick are still unscheduled and come back here.
        task_pool.retain(|key| tasks.get(*key).map(|t| t.status() == TaskStatus::Unscheduled).unwrap_or(false));
        for key in ready {
            if !task_pool.contains(&key) {
                task_pool.push_back(key);
            }
        }

        let taken = busy_machines(existing);
        let mut allocations = Vec::new();
        for machine in cluster.get_idle_resources(&plan.observation) {
            if taken.contains(&machine) {
                continue;
            }
            let Some(key) = task_pool.pop_front() else {
                break;
            };
            allocations.push((key, machine));
        }

        Ok(PolicyOutcome { allocations, status })
    }
}
