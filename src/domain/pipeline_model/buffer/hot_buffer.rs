use std::collections::{BTreeMap, VecDeque};

use crate::domain::pipeline_model::utils::id::ObservationId;
use crate::error::{Error, Result};

/// An observation's data as held by one buffer tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedObservation {
    pub observation: ObservationId,
    pub size: u64,
}

/// An observation moving from hot to cold storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTransfer {
    pub observation: ObservationId,
    pub size: u64,
    pub residual: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IncomingStream {
    expected: u64,
    received: u64,
}

/// Tier absorbing live ingest.
#[derive(Debug, Clone)]
pub struct HotBuffer {
    pub total_capacity: u64,
    pub current_capacity: u64,
    pub max_ingest_rate: u64,

    /// Fully ingested observations waiting to move to cold storage, oldest first.
    pub stored: VecDeque<BufferedObservation>,
    pub transfer: Option<DataTransfer>,

    incoming: BTreeMap<ObservationId, IncomingStream>,
}

impl HotBuffer {
    pub fn new(capacity: u64, max_ingest_rate: u64) -> Self {
        HotBuffer {
            total_capacity: capacity,
            current_capacity: capacity,
            max_ingest_rate,
            stored: VecDeque::new(),
            transfer: None,
            incoming: BTreeMap::new(),
        }
    }

    /// Capacity left once every open stream has delivered what it still owes.
    pub fn uncommitted_capacity(&self) -> u64 {
        let owed: u64 = self.incoming.values().map(|s| s.expected.saturating_sub(s.received)).sum();
        self.current_capacity.saturating_sub(owed)
    }

    /// Data already in or heading into this tier that will end up in cold storage.
    pub fn pending_for_cold(&self) -> u64 {
        let incoming: u64 = self.incoming.values().map(|s| s.expected.max(s.received)).sum();
        let stored: u64 = self.stored.iter().map(|o| o.size).sum();
        let in_flight = self.transfer.as_ref().map(|t| t.residual).unwrap_or(0);
        incoming + stored + in_flight
    }

    pub fn is_streaming(&self, observation: &ObservationId) -> bool {
        self.incoming.contains_key(observation)
    }

    pub fn open_stream(&mut self, observation: ObservationId, expected: u64) {
        self.incoming.insert(observation, IncomingStream { expected, received: 0 });
    }

    /// Accepts one tick worth of data for `observation`.
    pub fn process_incoming_data_stream(&mut self, observation: &ObservationId, rate: u64) -> Result<()> {
        if rate > self.max_ingest_rate {
            return Err(Error::IngestRateExceeded { observation: observation.to_string(), rate, max: self.max_ingest_rate });
        }
        if rate > self.current_capacity {
            return Err(Error::BufferBoundViolated(format!(
                "hot buffer has {} left, observation {} pushes {}",
                self.current_capacity, observation, rate
            )));
        }
        let stream = self
            .incoming
            .get_mut(observation)
            .ok_or_else(|| Error::BufferBoundViolated(format!("no open stream for observation {}", observation)))?;

        stream.received += rate;
        self.current_capacity -= rate;
        Ok(())
    }

    /// Ends the stream and queues the received data for transfer to cold storage.
    pub fn close_stream(&mut self, observation: &ObservationId) -> Result<u64> {
        let stream = self
            .incoming
            .remove(observation)
            .ok_or_else(|| Error::BufferBoundViolated(format!("no open stream for observation {}", observation)))?;
        self.stored.push_back(BufferedObservation { observation: observation.clone(), size: stream.received });
        Ok(stream.received)
    }

    /// Oldest stored observation, removed from `stored`.
    pub fn next_observation_for_transfer(&mut self) -> Option<BufferedObservation> {
        self.stored.pop_front()
    }

    /// Frees `amount` units that have left this tier.
    pub fn release(&mut self, amount: u64) -> Result<()> {
        let capacity = self.current_capacity + amount;
        if capacity > self.total_capacity {
            return Err(Error::BufferBoundViolated(format!("hot buffer would hold {} of {} free", capacity, self.total_capacity)));
        }
        self.current_capacity = capacity;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty() && self.transfer.is_none() && self.incoming.is_empty()
    }
}
