use slotmap::{SlotMap, new_key_type};

use crate::domain::pipeline_model::task::task::Task;
use crate::error::{Error, Result};

new_key_type! {
    pub struct TaskKey;
}

/// Owner of every task created during a run.
///
/// Plans and the cluster refer to tasks through [`TaskKey`]s; tasks are never
/// removed so finished work stays available for the timing summary.
#[derive(Debug, Default)]
pub struct TaskStore {
    slots: SlotMap<TaskKey, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self { slots: SlotMap::with_key() }
    }

    pub fn add(&mut self, task: Task) -> TaskKey {
        self.slots.insert(task)
    }

    pub fn get(&self, key: TaskKey) -> Result<&Task> {
        self.slots.get(key).ok_or_else(|| Error::UnknownTask(format!("{:?}", key)))
    }

    pub fn get_mut(&mut self, key: TaskKey) -> Result<&mut Task> {
        self.slots.get_mut(key).ok_or_else(|| Error::UnknownTask(format!("{:?}", key)))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskKey, &Task)> {
        self.slots.iter()
    }
}
