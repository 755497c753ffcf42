use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::domain::pipeline_model::system::SystemModel;
use crate::domain::simulator::environment::Environment;
use crate::domain::simulator::process::{Process, Yield};
use crate::error::Result;

/// Discrete virtual time. One tick is the smallest schedulable step.
pub type Tick = u64;

pub type ProcessId = usize;

/// Cooperative discrete-event engine driving a [`SystemModel`].
///
/// Pending wake-ups are ordered by `(tick, process id)`. Ids are handed out in
/// registration order, so processes woken in the same tick always resume in
/// the order they were started, which keeps every run reproducible.
#[derive(Debug)]
pub struct Simulator {
    now: Tick,
    queue: BinaryHeap<Reverse<(Tick, ProcessId)>>,
    processes: Vec<Option<Box<dyn Process>>>,
    model: SystemModel,
}

impl Simulator {
    pub fn new(model: SystemModel) -> Simulator {
        Simulator { now: 0, queue: BinaryHeap::new(), processes: Vec::new(), model }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn model(&self) -> &SystemModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut SystemModel {
        &mut self.model
    }

    /// Registers a process; it first resumes at the current tick.
    pub fn spawn(&mut self, process: Box<dyn Process>) -> ProcessId {
        let pid = self.processes.len();
        log::debug!("t={} registered process {} as #{}", self.now, process.name(), pid);
        self.processes.push(Some(process));
        self.queue.push(Reverse((self.now, pid)));
        pid
    }

    /// Number of processes that have not finished yet.
    pub fn active_processes(&self) -> usize {
        self.processes.iter().filter(|p| p.is_some()).count()
    }

    /// Runs `f` against the model at the current tick, outside of any process.
    ///
    /// This is how a driver calls into the model between ticks. Processes
    /// spawned by `f` are registered afterwards, even when `f` fails.
    pub fn call<R>(&mut self, f: impl FnOnce(&mut Environment, &mut SystemModel) -> R) -> R {
        let mut env = Environment::new(self.now);
        let result = f(&mut env, &mut self.model);
        for process in env.into_spawned() {
            self.spawn(process);
        }
        result
    }

    /// Processes every wake-up scheduled strictly before `until`, then sets the
    /// clock to `until`. Asking for a tick in the past is a no-op.
    ///
    /// A fatal error from a process ends the run and is returned; the failing
    /// process is dropped.
    pub fn run_until(&mut self, until: Tick) -> Result<()> {
        if until < self.now {
            log::warn!("Ignoring request to run until t={}, the clock is already at t={}", until, self.now);
            return Ok(());
        }

        while let Some(&Reverse((tick, pid))) = self.queue.peek() {
            if tick >= until {
                break;
            }
            self.queue.pop();
            self.now = tick;

            let Some(mut process) = self.processes[pid].take() else {
                continue;
            };

            let mut env = Environment::new(tick);
            let outcome = process.resume(&mut env, &mut self.model);
            let spawned = env.into_spawned();

            match outcome {
                Ok(Yield::Sleep(ticks)) => {
                    self.processes[pid] = Some(process);
                    self.queue.push(Reverse((tick + ticks, pid)));
                }
                Ok(Yield::Done) => {
                    log::debug!("t={} process {} (#{}) finished", tick, process.name(), pid);
                }
                Err(e) => {
                    log::error!("t={} process {} (#{}) failed: {}", tick, process.name(), pid, e);
                    for process in spawned {
                        self.spawn(process);
                    }
                    return Err(e);
                }
            }

            for process in spawned {
                self.spawn(process);
            }
        }

        self.now = until;
        Ok(())
    }

    /// Advances the clock by `ticks`.
    pub fn advance(&mut self, ticks: Tick) -> Result<()> {
        self.run_until(self.now + ticks)
    }
}
