use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

use crate::domain::simulator::simulator::Tick;

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize)]
pub struct Id<T> {
    pub id: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Id { id: id.into(), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for String {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> From<&str> for Id<T> {
    fn from(id: &str) -> Self {
        Id::new(id)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {:?}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct MachineTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ObservationTag;

pub type MachineId = Id<MachineTag>;
pub type ObservationId = Id<ObservationTag>;

/// Index of a node inside an observation's workflow graph.
pub type NodeId = usize;

/// Which part of an observation a task belongs to.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum TaskNode {
    /// One of the synthetic tasks occupying ingest machines while data streams in.
    Ingest(usize),
    /// A node of the observation's workflow graph.
    Workflow(NodeId),
}

/// Composite task identity.
///
/// The admission tick separates re-submissions of the same workflow template
/// under the same observation name.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct TaskId {
    pub observation: ObservationId,
    pub admitted_at: Tick,
    pub node: TaskNode,
}

impl TaskId {
    pub fn workflow(observation: ObservationId, admitted_at: Tick, node: NodeId) -> Self {
        TaskId { observation, admitted_at, node: TaskNode::Workflow(node) }
    }

    pub fn ingest(observation: ObservationId, admitted_at: Tick, index: usize) -> Self {
        TaskId { observation, admitted_at, node: TaskNode::Ingest(index) }
    }

    pub fn is_ingest(&self) -> bool {
        matches!(self.node, TaskNode::Ingest(_))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            TaskNode::Ingest(index) => write!(f, "{}_{}_ingest{}", self.observation, self.admitted_at, index),
            TaskNode::Workflow(node) => write!(f, "{}_{}_{}", self.observation, self.admitted_at, node),
        }
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId: {:?}", self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_of_resubmitted_workflows_differ() {
        let first = TaskId::workflow(ObservationId::new("emu"), 0, 3);
        let second = TaskId::workflow(ObservationId::new("emu"), 40, 3);

        assert_ne!(first, second);
        assert_eq!(first.to_string(), "emu_0_3");
        assert_eq!(second.to_string(), "emu_40_3");
    }

    #[test]
    fn ingest_and_workflow_nodes_never_collide() {
        let ingest = TaskId::ingest(ObservationId::new("emu"), 0, 1);
        let workflow = TaskId::workflow(ObservationId::new("emu"), 0, 1);

        assert_ne!(ingest, workflow);
        assert!(ingest.is_ingest());
        assert!(!workflow.is_ingest());
    }
}
