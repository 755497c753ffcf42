pub mod policy;
pub mod scheduler;
pub mod scheduler_processes;
