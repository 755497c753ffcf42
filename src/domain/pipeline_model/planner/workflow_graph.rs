use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::pipeline_model::utils::id::NodeId;
use crate::error::{Error, Result};

/// Represents a node in the workflow graph (a processing step).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowNode {
    pub id: NodeId,
    pub flops: f64,
    pub io: f64,
    pub memory: f64,
}

impl WorkflowNode {
    pub fn new(id: NodeId) -> Self {
        WorkflowNode { id, flops: 0.0, io: 0.0, memory: 0.0 }
    }
}

/// Task precedence graph processing one observation's data.
///
/// Validated on construction: every edge joins two known nodes and the graph
/// has no cycle.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    nodes: BTreeMap<NodeId, WorkflowNode>,
    edges: BTreeSet<(NodeId, NodeId)>,
}

impl WorkflowGraph {
    pub fn new(nodes: Vec<WorkflowNode>, edges: Vec<(NodeId, NodeId)>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for node in nodes {
            let id = node.id;
            if by_id.insert(id, node).is_some() {
                return Err(Error::ModelConstructionError(format!("workflow node {} is defined twice", id)));
            }
        }

        for &(from, to) in &edges {
            if !by_id.contains_key(&from) || !by_id.contains_key(&to) {
                return Err(Error::ModelConstructionError(format!("edge {} -> {} references an unknown node", from, to)));
            }
        }

        let graph = WorkflowGraph { nodes: by_id, edges: edges.into_iter().collect() };
        graph.topological_order()?;
        Ok(graph)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &WorkflowNode> {
        self.nodes.values()
    }

    pub fn get_node(&self, node: NodeId) -> Option<&WorkflowNode> {
        self.nodes.get(&node)
    }

    pub fn edges(&self) -> impl Iterator<Item = &(NodeId, NodeId)> {
        self.edges.iter()
    }

    pub fn predecessors(&self, node: NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|(_, to)| *to == node).map(|(from, _)| *from).collect()
    }

    pub fn successors(&self, node: NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|(from, _)| *from == node).map(|(_, to)| *to).collect()
    }

    /// Kahn's algorithm, lowest node id first among the ready ones.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut in_degree: BTreeMap<NodeId, usize> = self.nodes.keys().map(|id| (*id, 0)).collect();
        for (_, to) in &self.edges {
            *in_degree.entry(*to).or_insert(0) += 1;
        }

        let mut ready: VecDeque<NodeId> = in_degree.iter().filter(|(_, d)| **d == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = ready.pop_front() {
            order.push(node);
            for successor in self.successors(node) {
                if let Some(degree) = in_degree.get_mut(&successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(successor);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(Error::ModelConstructionError("workflow graph contains a cycle".to_string()));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(n: usize) -> Vec<WorkflowNode> {
        (0..n).map(WorkflowNode::new).collect()
    }

    #[test]
    fn rejects_cycles_and_dangling_edges() {
        assert!(WorkflowGraph::new(nodes(2), vec![(0, 1), (1, 0)]).is_err());
        assert!(WorkflowGraph::new(nodes(2), vec![(0, 5)]).is_err());
    }

    #[test]
    fn orders_a_diamond() {
        let graph = WorkflowGraph::new(nodes(4), vec![(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
        assert_eq!(graph.topological_order().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(graph.predecessors(3), vec![1, 2]);
        assert_eq!(graph.successors(0), vec![1, 2]);
        assert_eq!(graph.edges().filter(|(from, _)| *from == 0).count(), 2);
        assert!(graph.get_node(3).is_some());
        assert!(graph.get_node(4).is_none());
    }
}
