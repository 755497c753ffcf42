use std::collections::{BTreeMap, VecDeque};

use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::planner::workflow_plan::WorkflowPlan;
use crate::domain::pipeline_model::scheduler::policy::allocation_policy::{AllocationPolicy, PolicyOutcome, busy_machines, drift_status};
use crate::domain::pipeline_model::task::task_store::{TaskKey, TaskStore};
use crate::domain::pipeline_model::utils::id::MachineId;
use crate::domain::simulator::simulator::Tick;
use crate::error::Result;

/// Puts ready tasks, earliest estimated start first, onto whatever machine is available.
#[derive(Debug, Default)]
pub struct GreedyPolicy;

impl AllocationPolicy for GreedyPolicy {
    fn name(&self) -> &str {
        "greedy"
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

        let taken = busy_machines(existing);
        let free = cluster.get_available_resources().into_iter().filter(|m| !taken.contains(m));
        let allocations = ready.into_iter().zip(free).collect();

        Ok(PolicyOutcome { allocations, status })
    }
}
