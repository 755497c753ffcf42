use crate::api::simulation_dto::system_dto::SimulationDto;
use crate::domain::pipeline_model::system::Simulation;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads a simulation configuration and builds a ready-to-run [`Simulation`].
pub fn generate_simulation(file_path: &str) -> Result<Simulation> {
    logger::init();
    log::info!("Logger initialized. Starting Simulation construction.");

    let root_dto: SimulationDto = parse_json_file::<SimulationDto>(file_path)?;
    log::info!("JSON file parsed successfully.");

    let simulation = Simulation::try_from(root_dto)?;
    log::info!(
        "Simulation constructed with {} machines and {} waiting observations.",
        simulation.model().cluster.machine_count(),
        simulation.pending_observations().len()
    );

    Ok(simulation)
}
