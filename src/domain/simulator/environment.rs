use crate::domain::simulator::process::Process;
use crate::domain::simulator::simulator::Tick;

/// The view of the simulator handed to code running inside a tick.
///
/// It exposes the current virtual time and collects processes started during
/// the tick; the simulator registers them, in the order they were spawned,
/// once control returns to it.
#[derive(Debug)]
pub struct Environment {
    now: Tick,
    spawned: Vec<Box<dyn Process>>,
}

impl Environment {
    pub fn new(now: Tick) -> Self {
        Environment { now, spawned: Vec::new() }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn spawn(&mut self, process: Box<dyn Process>) {
        log::debug!("t={} spawning process {}", self.now, process.name());
        self.spawned.push(process);
    }

    pub fn into_spawned(self) -> Vec<Box<dyn Process>> {
        self.spawned
    }
}
