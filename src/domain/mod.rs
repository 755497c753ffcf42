pub mod pipeline_model;
pub mod simulator;
