use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::domain::pipeline_model::cluster::cluster::Cluster;
use crate::domain::pipeline_model::observation::observation::Observation;
use crate::domain::pipeline_model::utils::id::{MachineId, NodeId};
use crate::domain::simulator::simulator::Tick;
use crate::error::{Error, Result};

/// Placement and timing of one workflow node, relative to the workflow start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSchedule {
    pub machine: MachineId,
    pub est: Tick,
    pub eft: Tick,
}

impl NodeSchedule {
    pub fn duration(&self) -> Tick {
        self.eft.saturating_sub(self.est)
    }
}

/// Output of a static workflow scheduling heuristic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSolution {
    entries: BTreeMap<NodeId, NodeSchedule>,
}

impl StaticSolution {
    pub fn new() -> Self {
        StaticSolution::default()
    }

    pub fn insert(&mut self, node: NodeId, machine: MachineId, est: Tick, eft: Tick) {
        self.entries.insert(node, NodeSchedule { machine, est, eft });
    }

    pub fn with(mut self, node: NodeId, machine: impl Into<String>, est: Tick, eft: Tick) -> Self {
        self.insert(node, MachineId::new(machine), est, eft);
        self
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeSchedule> {
        self.entries.get(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeSchedule)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn makespan(&self) -> Tick {
        let start = self.entries.values().map(|e| e.est).min().unwrap_or(0);
        let end = self.entries.values().map(|e| e.eft).max().unwrap_or(0);
        end - start
    }
}

/// Maps a workflow graph onto the cluster.
///
/// The heuristics themselves live outside this crate; the planner only
/// consumes their output.
pub trait StaticScheduler: Debug {
    fn name(&self) -> &str;

    fn solve(&self, observation: &Observation, cluster: &Cluster) -> Result<StaticSolution>;
}

/// Serves the solution shipped with the observation's workflow.
#[derive(Debug, Default)]
pub struct PrecomputedScheduler;

impl StaticScheduler for PrecomputedScheduler {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn solve(&self, observation: &Observation, _cluster: &Cluster) -> Result<StaticSolution> {
        observation
            .solution
            .clone()
            .ok_or_else(|| Error::IncompleteSolution(format!("observation {} carries no static solution", observation.id)))
    }
}
