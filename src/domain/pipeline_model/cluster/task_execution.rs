use crate::domain::pipeline_model::system::SystemModel;
use crate::domain::pipeline_model::task::task_store::TaskKey;
use crate::domain::pipeline_model::utils::id::{MachineId, ObservationId};
use crate::domain::simulator::environment::Environment;
use crate::domain::simulator::process::{Process, Yield};
use crate::error::Result;

/// Pool a machine was drawn from, and therefore the pool it returns to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolOrigin {
    Available,
    Ingest,
    Idle(ObservationId),
}

/// Executes one task on one machine (`do_work`).
///
/// First resume: the task starts and the process sleeps for its runtime minus
/// one tick. Second resume: the task finishes and the cluster takes the
/// machine back.
#[derive(Debug)]
pub struct TaskExecution {
    task: TaskKey,
    machine: MachineId,
    origin: PoolOrigin,
    started: bool,
}

impl TaskExecution {
    pub fn new(task: TaskKey, machine: MachineId, origin: PoolOrigin) -> Self {
        TaskExecution { task, machine, origin, started: false }
    }
}

impl Process for TaskExecution {
    fn name(&self) -> String {
        format!("TaskExecution({:?} on {})", self.task, self.machine)
    }

    fn resume(&mut self, env: &mut Environment, model: &mut SystemModel) -> Result<Yield> {
        let task = model.tasks.get_mut(self.task)?;

        if !self.started {
            self.started = true;
            let suspend = task.start(env.now())?;
            return Ok(Yield::Sleep(suspend));
        }

        task.finish(env.now())?;
        log::debug!("t={} task {} finished on {}", env.now(), task.id, self.machine);
        model.cluster.finish_task_execution(self.task, &self.machine, &self.origin)?;
        Ok(Yield::Done)
    }
}
