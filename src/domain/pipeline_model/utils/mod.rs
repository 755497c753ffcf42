pub mod id;
pub mod task_time_table;
