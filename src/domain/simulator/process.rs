use std::fmt::Debug;

use crate::domain::pipeline_model::system::SystemModel;
use crate::domain::simulator::environment::Environment;
use crate::domain::simulator::simulator::Tick;
use crate::error::Result;

/// What a process asks the simulator to do after it yields control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Yield {
    /// Resume again `n` ticks from now. `Sleep(0)` resumes within the same tick.
    Sleep(Tick),
    /// The process has finished and is dropped.
    Done,
}

/// A logical task multiplexed over the virtual clock.
///
/// A process runs uninterrupted from one resume until it returns, so every
/// mutation it makes to the [`SystemModel`] is atomic with respect to the other
/// processes.
pub trait Process: Debug {
    fn name(&self) -> String;

    fn resume(&mut self, env: &mut Environment, model: &mut SystemModel) -> Result<Yield>;
}
