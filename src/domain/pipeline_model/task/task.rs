use std::fmt;

use crate::domain::pipeline_model::task::delay_model::DelayModel;
use crate::domain::pipeline_model::utils::id::{MachineId, TaskId};
use crate::domain::simulator::simulator::Tick;
use crate::error::{Error, Result};

/// Lifecycle of a task. Transitions only ever go one step forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskStatus {
    Unscheduled,
    Scheduled,
    Running,
    Finished,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Unscheduled => "UNSCHEDULED",
            TaskStatus::Scheduled => "SCHEDULED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Finished => "FINISHED",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceDemand {
    pub flops: f64,
    pub io: f64,
    pub memory: f64,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub predecessors: Vec<TaskId>,
    pub demand: ResourceDemand,

    /// Nominal runtime in ticks, taken from the static solution.
    pub duration: Tick,

    /// Estimated start and finish from the static solution.
    pub est: Tick,
    pub eft: Tick,

    /// Actual start and finish, set while executing.
    pub ast: Option<Tick>,
    pub aft: Option<Tick>,

    /// Machine the static solution put this task on.
    pub planned_machine: Option<MachineId>,

    /// Machine the task was actually allocated to.
    pub machine: Option<MachineId>,

    pub delayed: bool,
    /// Ticks added to the nominal runtime by the delay model.
    pub delay: Tick,

    pub delay_model: Option<DelayModel>,

    status: TaskStatus,
}

impl Task {
    pub fn new(id: TaskId, duration: Tick, est: Tick, eft: Tick) -> Self {
        Task {
            id,
            predecessors: Vec::new(),
            demand: ResourceDemand::default(),
            duration,
            est,
            eft,
            ast: None,
            aft: None,
            planned_machine: None,
            machine: None,
            delayed: false,
            delay: 0,
            delay_model: None,
            status: TaskStatus::Unscheduled,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == TaskStatus::Finished
    }

    fn transition(&mut self, from: TaskStatus, to: TaskStatus) -> Result<()> {
        if self.status != from {
            return Err(Error::InvalidTaskTransition { task: self.id.to_string(), from: self.status.to_string(), to: to.to_string() });
        }
        self.status = to;
        Ok(())
    }

    /// UNSCHEDULED -> SCHEDULED, bound to `machine`.
    pub fn schedule(&mut self, machine: MachineId) -> Result<()> {
        self.transition(TaskStatus::Unscheduled, TaskStatus::Scheduled)?;
        self.machine = Some(machine);
        Ok(())
    }

    /// SCHEDULED -> RUNNING.
    ///
    /// The runtime is fixed here, once, from the nominal duration and the
    /// attached delay model. Returns the number of ticks the execution
    /// suspends before it can finish.
    pub fn start(&mut self, now: Tick) -> Result<Tick> {
        self.transition(TaskStatus::Scheduled, TaskStatus::Running)?;
        self.ast = Some(now);

        let runtime = match &self.delay_model {
            Some(model) => model.generate_delay(self.duration),
            None => self.duration,
        };
        if runtime > self.duration {
            self.delayed = true;
            self.delay = runtime - self.duration;
            log::debug!("t={} task {} delayed by {} ticks", now, self.id, self.delay);
        }

        Ok(runtime.max(1) - 1)
    }

    /// RUNNING -> FINISHED.
    pub fn finish(&mut self, now: Tick) -> Result<()> {
        self.transition(TaskStatus::Running, TaskStatus::Finished)?;
        self.aft = Some(now);
        Ok(())
    }
}
