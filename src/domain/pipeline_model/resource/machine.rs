use crate::api::simulation_dto::system_dto::MachineDto;
use crate::domain::pipeline_model::utils::id::MachineId;

/// A compute node of the cluster with fixed capacities.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub id: MachineId,
    pub cpu: u64,
    pub memory: u64,
    pub disk: u64,
    pub bandwidth: f64,
}

impl Machine {
    pub fn new(id: impl Into<String>, cpu: u64, memory: u64, disk: u64, bandwidth: f64) -> Self {
        Machine { id: MachineId::new(id), cpu, memory, disk, bandwidth }
    }

    /// A machine with unit capacities, handy for homogeneous clusters.
    pub fn homogeneous(id: impl Into<String>) -> Self {
        Machine::new(id, 1, 1, 1, 1.0)
    }
}

impl From<MachineDto> for Machine {
    fn from(dto: MachineDto) -> Self {
        Machine::new(dto.id, dto.cpu, dto.memory, dto.disk, dto.bandwidth)
    }
}
