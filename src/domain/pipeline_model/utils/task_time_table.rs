use std::io::Write;

use serde::Serialize;

use crate::domain::pipeline_model::task::task::Task;
use crate::domain::simulator::simulator::Tick;
use crate::error::Result;

/// One row of the finished-task timing summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTimeRecord {
    pub task: String,
    pub observation: String,
    pub machine: Option<String>,
    pub est: Tick,
    pub eft: Tick,
    pub ast: Option<Tick>,
    pub aft: Option<Tick>,
    pub delayed: bool,
}

impl From<&Task> for TaskTimeRecord {
    fn from(task: &Task) -> Self {
        TaskTimeRecord {
            task: task.id.to_string(),
            observation: task.id.observation.to_string(),
            machine: task.machine.as_ref().map(|m| m.to_string()),
            est: task.est,
            eft: task.eft,
            ast: task.ast,
            aft: task.aft,
            delayed: task.delayed,
        }
    }
}

/// Writes the summary as `;`-separated text with a header row.
///
/// Where the bytes end up is the caller's business.
pub fn write_task_time_csv<W: Write>(records: &[TaskTimeRecord], writer: W) -> Result<()> {
    let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    for record in records {
        csv_wtr.serialize(record)?;
    }
    csv_wtr.flush()?;
    Ok(())
}
