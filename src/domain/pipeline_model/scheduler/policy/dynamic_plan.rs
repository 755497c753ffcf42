use std::collections::{BTreeMap, VecDeque};

use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::planner::workflow_plan::WorkflowPlan;
use crate::domain::pipeline_model::scheduler::policy::allocation_policy::{AllocationPolicy, PolicyOutcome, busy_machines, drift_status};
use crate::domain::pipeline_model::task::task_store::{TaskKey, TaskStore};
use crate::domain::pipeline_model::utils::id::MachineId;
use crate::domain::simulator::simulator::Tick;
use crate::error::Result;

/// Follows the static solution: a ready task only runs on the machine it was
/// planned on, once that machine is free.
#[derive(Debug, Default)]
pub struct DynamicPlanPolicy;

impl AllocationPolicy for DynamicPlanPolicy {
    fn name(&self) -> &str {
        "dynamic_plan"
    }

    fn run(
        &self,
        cluster: &mut Cluster,
        now: Tick,
        plan: &WorkflowPlan,
        tasks: &TaskStore,
        existing: &BTreeMap<TaskKey, MachineId>,
        _task_pool: &mut VecDeque<TaskKey>,
    ) -> Result<PolicyOutcome> {
        let ready = plan.ready_tasks(tasks)?;
        let status = drift_status(now, plan, &ready, tasks)?;

        let mut taken = busy_machines(existing);
        let mut allocations = Vec::new();
        for key in ready {
            let Some(machine) = tasks.get(key)?.planned_machine.clone() else {
                continue;
            };
            if taken.contains(&machine) || !cluster.can_allocate(&machine, &plan.observation) {
                continue;
            }
            taken.insert(machine.clone());
            allocations.push((key, machine));
        }

        Ok(PolicyOutcome { allocations, status })
    }
}
