use crate::domain::pipeline_model::buffer::hot_buffer::BufferedObservation;
use crate::domain::pipeline_model::utils::id::ObservationId;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColdEntry {
    pub data: BufferedObservation,
    /// Handed to the scheduler, still occupying space until processing finishes.
    pub dispatched: bool,
}

/// Tier holding data staged for processing.
#[derive(Debug, Clone)]
pub struct ColdBuffer {
    pub total_capacity: u64,
    pub current_capacity: u64,
    pub max_data_rate: u64,

    /// Observations in arrival order.
    pub stored: Vec<ColdEntry>,

    /// Observation currently arriving from the hot tier.
    pub incoming: Option<BufferedObservation>,
}

impl ColdBuffer {
    pub fn new(capacity: u64, max_data_rate: u64) -> Self {
        ColdBuffer { total_capacity: capacity, current_capacity: capacity, max_data_rate, stored: Vec::new(), incoming: None }
    }

    /// Takes in `amount` units arriving from the hot tier.
    pub fn receive(&mut self, amount: u64) -> Result<()> {
        if amount > self.current_capacity {
            return Err(Error::BufferBoundViolated(format!("cold buffer has {} left, transfer pushes {}", self.current_capacity, amount)));
        }
        self.current_capacity -= amount;
        Ok(())
    }

    /// Units of the incoming observation received so far, read off the
    /// capacity taken beyond what stored observations hold.
    pub fn received_in_flight(&self) -> u64 {
        let stored: u64 = self.stored.iter().map(|e| e.data.size).sum();
        self.total_capacity.saturating_sub(self.current_capacity).saturating_sub(stored)
    }

    /// Units the incoming observation still needs, or `None` with nothing incoming.
    pub fn incoming_residual(&self) -> Option<u64> {
        self.incoming.as_ref().map(|data| data.size.saturating_sub(self.received_in_flight()))
    }

    pub fn store(&mut self, data: BufferedObservation) {
        self.stored.push(ColdEntry { data, dispatched: false });
    }

    pub fn has_undispatched(&self) -> bool {
        self.stored.iter().any(|e| !e.dispatched)
    }

    /// First-stored observation not yet handed out, now marked as dispatched.
    pub fn dispatch_next(&mut self) -> Option<ObservationId> {
        let entry = self.stored.iter_mut().find(|e| !e.dispatched)?;
        entry.dispatched = true;
        Some(entry.data.observation.clone())
    }

    /// Removes `observation` and frees its space. Returns the freed size.
    pub fn remove(&mut self, observation: &ObservationId) -> Option<u64> {
        let position = self.stored.iter().position(|e| &e.data.observation == observation)?;
        let entry = self.stored.remove(position);
        self.current_capacity += entry.data.size;
        Some(entry.data.size)
    }

    pub fn contains(&self, observation: &ObservationId) -> bool {
        self.stored.iter().any(|e| &e.data.observation == observation)
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty() && self.incoming.is_none()
    }
}
