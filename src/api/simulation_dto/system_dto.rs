use serde::{Deserialize, Serialize};

use crate::api::simulation_dto::observation_dto::ObservationDto;

/// Root of a simulation configuration file.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SimulationDto {
    pub cluster: ClusterDto,
    pub buffer: BufferDto,
    pub scheduler: SchedulerDto,
    #[serde(default)]
    pub delay_model: Option<DelayModelDto>,
    pub pipelines: Vec<PipelineDto>,
    #[serde(default)]
    pub observations: Vec<ObservationDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDto {
    #[serde(default)]
    pub machines: Vec<MachineDto>,

    /// Number of extra unit-capacity machines named `machine_<n>`.
    #[serde(default)]
    pub homogeneous_machines: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MachineDto {
    pub id: String,
    pub cpu: u64,
    pub memory: u64,
    pub disk: u64,
    pub bandwidth: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BufferDto {
    pub hot: BufferTierDto,
    pub cold: BufferTierDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BufferTierDto {
    pub capacity: u64,
    pub max_data_rate: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerDto {
    pub policy: String,
    pub max_ingest_resources: usize,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DelayModelDto {
    pub probability: f64,
    pub distribution: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDto {
    pub name: String,
    pub ingest_demand: usize,
}
