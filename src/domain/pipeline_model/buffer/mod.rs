pub mod buffer;
pub mod buffer_processes;
pub mod cold_buffer;
pub mod hot_buffer;
