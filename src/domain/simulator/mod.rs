pub mod environment;
pub mod process;
pub mod simulator;
