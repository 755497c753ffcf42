use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDto {
    pub name: String,
    pub demand: u64,
    pub duration: u64,
    pub ingest_rate: u64,
    pub pipeline: String,
    pub workflow: WorkflowGraphDto,

    /// Output of the static scheduling heuristic, one entry per node.
    #[serde(default)]
    pub solution: Vec<NodeScheduleDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraphDto {
    pub nodes: Vec<WorkflowNodeDto>,
    #[serde(default)]
    pub edges: Vec<EdgeDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNodeDto {
    pub id: usize,
    #[serde(default)]
    pub flops: f64,
    #[serde(default)]
    pub io: f64,
    #[serde(default)]
    pub memory: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDto {
    pub source: usize,
    pub target: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NodeScheduleDto {
    pub node: usize,
    pub machine: String,
    pub est: u64,
    pub eft: u64,
}
