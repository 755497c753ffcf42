use crate::api::simulation_dto::system_dto::BufferDto;
use crate::domain::pipeline_model::buffer::buffer_processes::IngestStream;
use crate::domain::pipeline_model::buffer::cold_buffer::ColdBuffer;
use crate::domain::pipeline_model::buffer::hot_buffer::{DataTransfer, HotBuffer};
use crate::domain::pipeline_model::observation::observation::Observation;
use crate::domain::pipeline_model::utils::id::ObservationId;
use crate::error::{Error, Result};

/// Capacity snapshot of both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSummary {
    pub hot_total_capacity: u64,
    pub hot_current_capacity: u64,
    pub hot_max_ingest_rate: u64,
    pub hot_stored: usize,
    pub cold_total_capacity: u64,
    pub cold_current_capacity: u64,
    pub cold_max_transfer_rate: u64,
    pub cold_stored: usize,
}

/// Two-tier storage: live ingest lands in `hot`, is migrated to `cold` and
/// waits there until its workflow has been processed.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub hot: HotBuffer,
    pub cold: ColdBuffer,
}

impl Buffer {
    pub fn new(hot: HotBuffer, cold: ColdBuffer) -> Self {
        Buffer { hot, cold }
    }

    /// True if both tiers can take the whole observation, counting space
    /// already promised to streams and transfers in progress.
    pub fn check_buffer_capacity(&self, observation: &Observation) -> bool {
        let size = observation.expected_size();
        let cold_free = self.cold.current_capacity.saturating_sub(self.hot.pending_for_cold());
        self.hot.uncommitted_capacity() >= size && cold_free >= size
    }

    /// Opens the hot-buffer stream for a RUNNING observation and returns the
    /// process that feeds it one tick at a time.
    pub fn ingest_data_stream(&mut self, observation: &Observation) -> Result<IngestStream> {
        if !observation.is_running() {
            return Err(Error::ObservationNotRunning(observation.id.to_string()));
        }
        self.hot.open_stream(observation.id.clone(), observation.expected_size());
        Ok(IngestStream::new(observation.id.clone()))
    }

    /// One tick of hot-to-cold migration.
    ///
    /// Starts the oldest hot-stored observation if nothing is in flight, then
    /// moves at most the cold tier's rate. Returns the observation whose
    /// transfer completed during this tick, if any.
    ///
    /// The hot residual is counted down per move while the cold residual is
    /// read off the cold capacity ledger. The two must agree after every move.
    pub fn move_hot_to_cold(&mut self) -> Result<Option<ObservationId>> {
        if self.hot.transfer.is_none() {
            if let Some(next) = self.hot.next_observation_for_transfer() {
                if next.size > self.cold.current_capacity {
                    return Err(Error::ColdCapacityExceeded {
                        observation: next.observation.to_string(),
                        size: next.size,
                        available: self.cold.current_capacity,
                    });
                }
                log::debug!("Starting hot to cold transfer of observation {} ({} units)", next.observation, next.size);
                self.hot.transfer = Some(DataTransfer { observation: next.observation.clone(), size: next.size, residual: next.size });
                self.cold.incoming = Some(next);
            }
        }

        let Some(transfer) = self.hot.transfer.as_mut() else {
            return Ok(None);
        };
        let observation = transfer.observation.clone();
        let amount = transfer.residual.min(self.cold.max_data_rate);
        transfer.residual -= amount;
        let hot_residual = transfer.residual;

        self.cold.receive(amount)?;
        self.hot.release(amount)?;

        let cold_residual = self.cold.incoming_residual().ok_or_else(|| Error::TransferResidualMismatch {
            observation: observation.to_string(),
            hot: hot_residual,
            cold: 0,
        })?;
        if hot_residual != cold_residual {
            return Err(Error::TransferResidualMismatch { observation: observation.to_string(), hot: hot_residual, cold: cold_residual });
        }

        if hot_residual > 0 {
            return Ok(None);
        }

        self.hot.transfer = None;
        if let Some(data) = self.cold.incoming.take() {
            log::info!("Observation {} ({} units) stored in cold buffer", data.observation, data.size);
            self.cold.store(data);
        }
        Ok(Some(observation))
    }

    pub fn has_observations_ready_for_processing(&self) -> bool {
        self.cold.has_undispatched()
    }

    /// Next cold-stored observation for the scheduler, first stored first.
    ///
    /// The data stays in the cold tier until
    /// [`Buffer::mark_observation_finished`] is called.
    pub fn next_observation_for_processing(&mut self) -> Option<ObservationId> {
        self.cold.dispatch_next()
    }

    /// Frees the observation's cold storage. Returns `false` if it is not stored.
    pub fn mark_observation_finished(&mut self, observation: &ObservationId) -> bool {
        match self.cold.remove(observation) {
            Some(size) => {
                log::debug!("Released {} cold units held by observation {}", size, observation);
                true
            }
            None => false,
        }
    }

    pub fn buffer_storage_summary(&self) -> BufferSummary {
        BufferSummary {
            hot_total_capacity: self.hot.total_capacity,
            hot_current_capacity: self.hot.current_capacity,
            hot_max_ingest_rate: self.hot.max_ingest_rate,
            hot_stored: self.hot.stored.len(),
            cold_total_capacity: self.cold.total_capacity,
            cold_current_capacity: self.cold.current_capacity,
            cold_max_transfer_rate: self.cold.max_data_rate,
            cold_stored: self.cold.stored.len(),
        }
    }

    pub fn bounds_hold(&self) -> bool {
        self.hot.current_capacity <= self.hot.total_capacity && self.cold.current_capacity <= self.cold.total_capacity
    }

    pub fn is_empty(&self) -> bool {
        self.hot.is_empty() && self.cold.is_empty()
    }
}

impl TryFrom<BufferDto> for Buffer {
    type Error = Error;

    fn try_from(dto: BufferDto) -> Result<Buffer> {
        if dto.hot.max_data_rate == 0 || dto.cold.max_data_rate == 0 {
            return Err(Error::ModelConstructionError("buffer data rates must be positive".to_string()));
        }
        Ok(Buffer::new(HotBuffer::new(dto.hot.capacity, dto.hot.max_data_rate), ColdBuffer::new(dto.cold.capacity, dto.cold.max_data_rate)))
    }
}
