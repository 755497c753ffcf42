use crate::api::simulation_dto::observation_dto::ObservationDto;
use crate::domain::pipeline_model::planner::static_solution::StaticSolution;
use crate::domain::pipeline_model::planner::workflow_graph::{WorkflowGraph, WorkflowNode};
use crate::domain::pipeline_model::planner::workflow_plan::WorkflowPlan;
use crate::domain::pipeline_model::utils::id::{MachineId, ObservationId};
use crate::domain::simulator::simulator::Tick;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationStatus {
    Waiting,
    Running,
    Finished,
}

/// A period of instrument activity producing one data stream and one workflow.
#[derive(Debug, Clone)]
pub struct Observation {
    pub id: ObservationId,

    /// Share of the instrument the observation needs.
    pub demand: u64,

    /// Length of the observation in ticks.
    pub duration: Tick,

    /// Data units written to the hot buffer per tick.
    pub ingest_rate: u64,

    /// Key into the pipeline table.
    pub pipeline: String,

    pub status: ObservationStatus,
    pub actual_start_time: Option<Tick>,

    /// Data ingested so far.
    pub total_data_size: u64,

    pub workflow: WorkflowGraph,

    /// Static solution supplied with the workflow, if any.
    pub solution: Option<StaticSolution>,

    pub plan: Option<WorkflowPlan>,
}

impl Observation {
    pub fn new(id: impl Into<String>, demand: u64, duration: Tick, ingest_rate: u64, pipeline: impl Into<String>, workflow: WorkflowGraph) -> Self {
        Observation {
            id: ObservationId::new(id),
            demand,
            duration,
            ingest_rate,
            pipeline: pipeline.into(),
            status: ObservationStatus::Waiting,
            actual_start_time: None,
            total_data_size: 0,
            workflow,
            solution: None,
            plan: None,
        }
    }

    pub fn with_solution(mut self, solution: StaticSolution) -> Self {
        self.solution = Some(solution);
        self
    }

    /// Size the observation will have once fully ingested.
    pub fn expected_size(&self) -> u64 {
        self.duration * self.ingest_rate
    }

    /// WAITING -> RUNNING at `now`.
    pub fn start(&mut self, now: Tick) -> Result<()> {
        if self.status != ObservationStatus::Waiting {
            return Err(Error::ObservationAlreadyAdmitted(format!("{} is {:?}", self.id, self.status)));
        }
        self.status = ObservationStatus::Running;
        self.actual_start_time = Some(now);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.status == ObservationStatus::Running
    }
}

impl TryFrom<ObservationDto> for Observation {
    type Error = Error;

    fn try_from(dto: ObservationDto) -> Result<Observation> {
        let nodes = dto
            .workflow
            .nodes
            .into_iter()
            .map(|n| WorkflowNode { id: n.id, flops: n.flops, io: n.io, memory: n.memory })
            .collect();
        let edges = dto.workflow.edges.into_iter().map(|e| (e.source, e.target)).collect();
        let workflow = WorkflowGraph::new(nodes, edges)?;

        let observation = Observation::new(dto.name, dto.demand, dto.duration, dto.ingest_rate, dto.pipeline, workflow);
        if dto.solution.is_empty() {
            return Ok(observation);
        }

        let mut solution = StaticSolution::new();
        for entry in dto.solution {
            if entry.eft < entry.est {
                return Err(Error::IncompleteSolution(format!("node {} of observation {} finishes before it starts", entry.node, observation.id)));
            }
            solution.insert(entry.node, MachineId::new(entry.machine), entry.est, entry.eft);
        }
        Ok(observation.with_solution(solution))
    }
}
