use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Debug;

use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::planner::workflow_plan::{PlanStatus, WorkflowPlan};
use crate::domain::pipeline_model::task::task_store::{TaskKey, TaskStore};
use crate::domain::pipeline_model::utils::id::MachineId;
use crate::domain::simulator::simulator::Tick;
use crate::error::Result;

/// New task-to-machine pairs proposed in one call, plus the plan status the
/// policy observed.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOutcome {
    pub allocations: Vec<(TaskKey, MachineId)>,
    pub status: PlanStatus,
}

/// Pluggable strategy deciding which ready tasks go where.
///
/// Implementations must only propose tasks whose predecessors have all
/// finished and must never propose the same machine twice in one call.
pub trait AllocationPolicy: Debug {
    fn name(&self) -> &str;

    /// `existing` holds the plan's allocations that are still running and
    /// `task_pool` is the policy's own queue for this plan, kept by the scheduler
    /// between calls.
    fn run(
        &self,
        cluster: &mut Cluster,
        now: Tick,
        plan: &WorkflowPlan,
        tasks: &TaskStore,
        existing: &BTreeMap<TaskKey, MachineId>,
        task_pool: &mut VecDeque<TaskKey>,
    ) -> Result<PolicyOutcome>;
}

/// DELAYED if any of `ready` is ready later than its estimated start, else the
/// plan's current status.
pub fn drift_status(now: Tick, plan: &WorkflowPlan, ready: &[TaskKey], tasks: &TaskStore) -> Result<PlanStatus> {
    for key in ready {
        if tasks.get(*key)?.est < now {
            return Ok(PlanStatus::Delayed);
        }
    }
    Ok(plan.status)
}

/// Machines already taken by the plan's running allocations.
pub fn busy_machines(existing: &BTreeMap<TaskKey, MachineId>) -> BTreeSet<MachineId> {
    existing.values().cloned().collect()
}
