use crate::domain::pipeline_model::system::SystemModel;
use crate::domain::pipeline_model::utils::id::ObservationId;
use crate::domain::simulator::environment::Environment;
use crate::domain::simulator::process::{Process, Yield};
use crate::domain::simulator::simulator::Tick;
use crate::error::{Error, Result};

/// Feeds one observation's data into the hot buffer, one tick at a time.
#[derive(Debug)]
pub struct IngestStream {
    observation: ObservationId,
    elapsed: Tick,
}

impl IngestStream {
    pub fn new(observation: ObservationId) -> Self {
        IngestStream { observation, elapsed: 0 }
    }
}

impl Process for IngestStream {
    fn name(&self) -> String {
        format!("IngestStream({})", self.observation)
    }

    fn resume(&mut self, env: &mut Environment, model: &mut SystemModel) -> Result<Yield> {
        let observation = model
            .observations
            .get_mut(&self.observation)
            .ok_or_else(|| Error::UnknownObservation(self.observation.to_string()))?;

        if !observation.is_running() {
            return Err(Error::ObservationNotRunning(self.observation.to_string()));
        }

        if self.elapsed < observation.duration {
            model.buffer.hot.process_incoming_data_stream(&self.observation, observation.ingest_rate)?;
            observation.total_data_size += observation.ingest_rate;
            self.elapsed += 1;
        }

        if self.elapsed < observation.duration {
            return Ok(Yield::Sleep(1));
        }

        let size = model.buffer.hot.close_stream(&self.observation)?;
        log::info!("t={} observation {} ingested {} units into the hot buffer", env.now(), self.observation, size);
        Ok(Yield::Done)
    }
}

/// Daemon migrating stored observations from the hot to the cold tier.
#[derive(Debug, Default)]
pub struct HotToColdTransfer;

impl Process for HotToColdTransfer {
    fn name(&self) -> String {
        "HotToColdTransfer".to_string()
    }

    fn resume(&mut self, env: &mut Environment, model: &mut SystemModel) -> Result<Yield> {
        if let Some(observation) = model.buffer.move_hot_to_cold()? {
            log::debug!("t={} observation {} ready for processing", env.now(), observation);
        }
        Ok(Yield::Sleep(1))
    }
}
