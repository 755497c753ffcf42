use std::collections::HashMap;

use crate::api::simulation_dto::system_dto::PipelineDto;

/// Processing pipeline an observation is recorded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub name: String,

    /// Machines needed to ingest one observation of this pipeline.
    pub ingest_demand: usize,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, ingest_demand: usize) -> Self {
        Pipeline { name: name.into(), ingest_demand }
    }
}

/// Pipelines by name.
pub type PipelineTable = HashMap<String, Pipeline>;

impl From<PipelineDto> for Pipeline {
    fn from(dto: PipelineDto) -> Self {
        Pipeline::new(dto.name, dto.ingest_demand)
    }
}
