pub mod planner;
pub mod static_solution;
pub mod workflow_graph;
pub mod workflow_plan;
