use std::collections::HashMap;

use crate::domain::pipeline_model::buffer::buffer::Buffer;
use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::observation::observation::Observation;
use crate::domain::pipeline_model::planner::static_solution::StaticScheduler;
use crate::domain::pipeline_model::planner::workflow_plan::WorkflowPlan;
use crate::domain::pipeline_model::task::delay_model::DelayModel;
use crate::domain::pipeline_model::task::task::{ResourceDemand, Task};
use crate::domain::pipeline_model::task::task_store::TaskStore;
use crate::domain::pipeline_model::utils::id::TaskId;
use crate::domain::simulator::simulator::Tick;
use crate::error::{Error, Result};

/// Turns an admitted observation's workflow into a [`WorkflowPlan`].
#[derive(Debug)]
pub struct Planner {
    static_scheduler: Box<dyn StaticScheduler>,
    delay_model: Option<DelayModel>,
}

impl Planner {
    pub fn new(static_scheduler: Box<dyn StaticScheduler>, delay_model: Option<DelayModel>) -> Self {
        Planner { static_scheduler, delay_model }
    }

    pub fn delay_model(&self) -> Option<&DelayModel> {
        self.delay_model.as_ref()
    }

    /// Ticks between admission and the earliest moment processing can start:
    /// the ingest itself plus the hot-to-cold migration of its data.
    pub fn staging_delay(observation: &Observation, buffer: &Buffer) -> Result<Tick> {
        let rate = buffer.buffer_storage_summary().cold_max_transfer_rate;
        if rate == 0 {
            return Err(Error::ModelConstructionError("cold buffer transfer rate must be positive".to_string()));
        }
        Ok(observation.duration + observation.expected_size().div_ceil(rate))
    }

    /// Builds the observation's plan and stores it on `observation.plan`.
    ///
    /// One task is created per workflow node. Its id carries the admission
    /// tick, its predecessors are translated into the same id scheme and its
    /// estimates are shifted by the admission tick plus the staging delay.
    pub fn run(&self, observation: &mut Observation, buffer: &Buffer, cluster: &Cluster, tasks: &mut TaskStore) -> Result<()> {
        let admitted_at = observation.actual_start_time.ok_or_else(|| Error::ObservationNotAdmitted(observation.id.to_string()))?;
        let solution = self.static_scheduler.solve(observation, cluster)?;

        for node in observation.workflow.nodes() {
            let entry = solution.get(node.id).ok_or_else(|| {
                Error::IncompleteSolution(format!("node {} of observation {} has no assignment", node.id, observation.id))
            })?;
            if !cluster.has_machine(&entry.machine) {
                return Err(Error::UnknownMachine(entry.machine.to_string()));
            }
        }

        let offset = admitted_at + Self::staging_delay(observation, buffer)?;

        let mut planned = Vec::with_capacity(observation.workflow.node_count());
        let mut index = HashMap::new();
        for node in observation.workflow.nodes() {
            let Some(entry) = solution.get(node.id) else {
                continue;
            };

            let id = TaskId::workflow(observation.id.clone(), admitted_at, node.id);
            let mut task = Task::new(id.clone(), entry.duration(), entry.est + offset, entry.eft + offset);
            task.predecessors = observation
                .workflow
                .predecessors(node.id)
                .into_iter()
                .map(|p| TaskId::workflow(observation.id.clone(), admitted_at, p))
                .collect();
            task.demand = ResourceDemand { flops: node.flops, io: node.io, memory: node.memory };
            task.planned_machine = Some(entry.machine.clone());
            task.delay_model = self.delay_model.as_ref().map(|model| model.for_node(node.id));

            let est = task.est;
            let key = tasks.add(task);
            index.insert(id, key);
            planned.push((est, node.id, key));
        }

        planned.sort_by_key(|(est, node, _)| (*est, *node));
        let est = planned.first().map(|(est, _, _)| *est).unwrap_or(offset);
        let eft = planned.iter().filter_map(|(_, _, key)| tasks.get(*key).ok().map(|t| t.eft)).max().unwrap_or(offset);
        let keys = planned.into_iter().map(|(_, _, key)| key).collect();

        let plan = WorkflowPlan::new(observation.id.clone(), keys, index, est, eft);
        log::info!(
            "Planned observation {} with {} tasks via {}: est {} eft {}",
            observation.id,
            plan.len(),
            self.static_scheduler.name(),
            est,
            eft
        );
        observation.plan = Some(plan);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline_model::buffer::cold_buffer::ColdBuffer;
    use crate::domain::pipeline_model::buffer::hot_buffer::HotBuffer;
    use crate::domain::pipeline_model::planner::static_solution::{PrecomputedScheduler, StaticSolution};
    use crate::domain::pipeline_model::planner::workflow_graph::{WorkflowGraph, WorkflowNode};
    use crate::domain::pipeline_model::resource::machine::Machine;
    use crate::domain::pipeline_model::utils::id::MachineId;

    fn setup() -> (Planner, Buffer, Cluster, Observation) {
        let planner = Planner::new(Box::new(PrecomputedScheduler), None);
        let buffer = Buffer::new(HotBuffer::new(1000, 10), ColdBuffer::new(1000, 4));
        let cluster = Cluster::new(vec![Machine::homogeneous("cat0"), Machine::homogeneous("cat1")]).unwrap();

        let graph = WorkflowGraph::new((0..3).map(WorkflowNode::new).collect(), vec![(0, 2), (1, 2)]).unwrap();
        let solution = StaticSolution::new().with(0, "cat0", 5, 8).with(1, "cat1", 0, 3).with(2, "cat0", 8, 10);
        // 5 ticks at 2 units: 10 units, staged in ceil(10 / 4) = 3 ticks
        let observation = Observation::new("emu", 1, 5, 2, "continuum", graph).with_solution(solution);
        (planner, buffer, cluster, observation)
    }

    #[test]
    fn planning_requires_admission() {
        let (planner, buffer, cluster, mut observation) = setup();
        let mut tasks = TaskStore::new();
        let err = planner.run(&mut observation, &buffer, &cluster, &mut tasks).unwrap_err();
        assert!(matches!(err, Error::ObservationNotAdmitted(_)));
        assert!(tasks.is_empty());
    }

    #[test]
    fn shifts_estimates_and_sorts_by_start() {
        let (planner, buffer, cluster, mut observation) = setup();
        let mut tasks = TaskStore::new();
        observation.start(4).unwrap();
        planner.run(&mut observation, &buffer, &cluster, &mut tasks).unwrap();

        let plan = observation.plan.as_ref().unwrap();
        let ids: Vec<String> = plan.task_keys().iter().map(|k| tasks.get(*k).unwrap().id.to_string()).collect();
        assert_eq!(ids, vec!["emu_4_1", "emu_4_0", "emu_4_2"]);

        // offset = 4 + 5 + 3
        let first = tasks.get(plan.task_keys()[0]).unwrap();
        assert_eq!((first.est, first.eft, first.duration), (12, 15, 3));
        assert_eq!((plan.est, plan.eft, plan.makespan()), (12, 22, 10));

        let last = tasks.get(plan.task_keys()[2]).unwrap();
        assert_eq!(last.predecessors.len(), 2);
        assert_eq!(last.planned_machine, Some(MachineId::new("cat0")));

        let ready = plan.ready_tasks(&tasks).unwrap();
        assert_eq!(ready.len(), 2);
    }

    #[test]
    fn rejects_unknown_machines_and_missing_nodes() {
        let (planner, buffer, cluster, mut observation) = setup();
        let mut tasks = TaskStore::new();
        observation.start(0).unwrap();

        observation.solution = Some(StaticSolution::new().with(0, "cat0", 0, 1).with(1, "cat9", 0, 1).with(2, "cat0", 1, 2));
        assert!(matches!(planner.run(&mut observation, &buffer, &cluster, &mut tasks), Err(Error::UnknownMachine(_))));

        observation.solution = Some(StaticSolution::new().with(0, "cat0", 0, 1));
        assert!(matches!(planner.run(&mut observation, &buffer, &cluster, &mut tasks), Err(Error::IncompleteSolution(_))));
        assert!(observation.plan.is_none());
    }
}
