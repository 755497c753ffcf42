pub mod buffer;
pub mod cluster;
pub mod observation;
pub mod planner;
pub mod resource;
pub mod scheduler;
pub mod system;
pub mod task;
pub mod utils;
