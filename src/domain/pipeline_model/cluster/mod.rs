pub mod cluster;
pub mod task_execution;
