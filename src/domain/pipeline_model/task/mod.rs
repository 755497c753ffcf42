pub mod delay_model;
pub mod task;
pub mod task_store;
