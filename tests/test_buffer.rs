use sdp_pipeline_sim::domain::pipeline_model::buffer::buffer::Buffer;
use sdp_pipeline_sim::domain::pipeline_model::buffer::buffer_processes::HotToColdTransfer;
use sdp_pipeline_sim::domain::pipeline_model::buffer::cold_buffer::ColdBuffer;
use sdp_pipeline_sim::domain::pipeline_model::buffer::hot_buffer::HotBuffer;
use sdp_pipeline_sim::domain::pipeline_model::cluster::cluster::Cluster;
use sdp_pipeline_sim::domain::pipeline_model::observation::observation::{Observation, ObservationStatus};
use sdp_pipeline_sim::domain::pipeline_model::observation::pipeline::PipelineTable;
use sdp_pipeline_sim::domain::pipeline_model::planner::planner::Planner;
use sdp_pipeline_sim::domain::pipeline_model::planner::static_solution::PrecomputedScheduler;
use sdp_pipeline_sim::domain::pipeline_model::planner::workflow_graph::WorkflowGraph;
use sdp_pipeline_sim::domain::pipeline_model::scheduler::policy::greedy::GreedyPolicy;
use sdp_pipeline_sim::domain::pipeline_model::scheduler::scheduler::Scheduler;
use sdp_pipeline_sim::domain::pipeline_model::system::SystemModel;
use sdp_pipeline_sim::domain::pipeline_model::utils::id::ObservationId;
use sdp_pipeline_sim::domain::simulator::simulator::{Simulator, Tick};
use sdp_pipeline_sim::error::Error;

fn simulator(hot: HotBuffer, cold: ColdBuffer) -> Simulator {
    let cluster = Cluster::new(Vec::new()).unwrap();
    let scheduler = Scheduler::new(Box::new(GreedyPolicy), 0);
    let planner = Planner::new(Box::new(PrecomputedScheduler), None);
    Simulator::new(SystemModel::new(cluster, Buffer::new(hot, cold), scheduler, planner, PipelineTable::new()))
}

/// Adds a RUNNING observation and starts streaming it.
fn start_ingest(simulator: &mut Simulator, name: &str, duration: Tick, rate: u64) -> ObservationId {
    let mut observation = Observation::new(name, 1, duration, rate, "continuum", WorkflowGraph::default());
    observation.start(simulator.now()).unwrap();
    let id = observation.id.clone();
    simulator.model_mut().add_observation(observation).unwrap();

    simulator
        .call(|env, model| {
            let stream = model.buffer.ingest_data_stream(&model.observations[&id])?;
            env.spawn(Box::new(stream));
            Ok::<(), Error>(())
        })
        .unwrap();
    id
}

#[test]
fn hot_buffer_absorbs_the_stream_tick_by_tick() {
    let mut simulator = simulator(HotBuffer::new(500, 2), ColdBuffer::new(500, 10));
    let obs = start_ingest(&mut simulator, "emu", 20, 2);

    simulator.advance(1).unwrap();
    assert_eq!(simulator.model().buffer.hot.current_capacity, 498);
    assert_eq!(simulator.model().observations[&obs].total_data_size, 2);
    assert!(simulator.model().buffer.hot.stored.is_empty());

    simulator.advance(19).unwrap();
    let hot = &simulator.model().buffer.hot;
    assert_eq!(hot.current_capacity, 500 - 2 * 20);
    assert_eq!(hot.stored.len(), 1);
    assert_eq!(hot.stored[0].observation, obs);
    assert_eq!(hot.stored[0].size, 40);
    assert!(!hot.is_streaming(&obs));
}

#[test]
fn stored_data_migrates_to_cold_at_the_cold_rate() {
    let mut simulator = simulator(HotBuffer::new(100, 5), ColdBuffer::new(100, 3));
    simulator.spawn(Box::new(HotToColdTransfer));
    let obs = start_ingest(&mut simulator, "emu", 2, 5);

    // ingest at t0 and t1, transfer of 10 units from t2 in ceil(10 / 3) = 4 ticks
    for _ in 0..5 {
        simulator.advance(1).unwrap();
        assert!(simulator.model().buffer.bounds_hold());
        assert!(!simulator.model().buffer.has_observations_ready_for_processing());
    }
    simulator.advance(1).unwrap();

    let buffer = &simulator.model().buffer;
    assert!(buffer.has_observations_ready_for_processing());
    assert!(buffer.cold.contains(&obs));
    assert_eq!(buffer.hot.current_capacity, 100);
    assert_eq!(buffer.cold.current_capacity, 90);

    let summary = buffer.buffer_storage_summary();
    assert_eq!((summary.hot_stored, summary.cold_stored), (0, 1));
}

#[test]
fn observations_are_processed_in_the_order_they_were_stored() {
    let mut simulator = simulator(HotBuffer::new(100, 5), ColdBuffer::new(100, 50));
    simulator.spawn(Box::new(HotToColdTransfer));
    let first = start_ingest(&mut simulator, "first", 2, 1);
    let second = start_ingest(&mut simulator, "second", 3, 1);

    simulator.advance(6).unwrap();

    let buffer = &mut simulator.model_mut().buffer;
    assert_eq!(buffer.next_observation_for_processing(), Some(first.clone()));
    assert_eq!(buffer.next_observation_for_processing(), Some(second.clone()));
    assert_eq!(buffer.next_observation_for_processing(), None);

    assert!(buffer.mark_observation_finished(&second));
    assert!(buffer.mark_observation_finished(&first));
    assert!(!buffer.mark_observation_finished(&first));
    assert_eq!(buffer.cold.current_capacity, 100);
    assert!(buffer.is_empty());
}

#[test]
fn stream_of_a_stopped_observation_is_fatal() {
    let mut simulator = simulator(HotBuffer::new(100, 5), ColdBuffer::new(100, 5));
    let obs = start_ingest(&mut simulator, "emu", 10, 1);
    simulator.advance(2).unwrap();

    simulator.model_mut().observations.get_mut(&obs).unwrap().status = ObservationStatus::Finished;
    let err = simulator.advance(1).unwrap_err();
    assert!(matches!(err, Error::ObservationNotRunning(_)));
}

#[test]
fn ingest_faster_than_the_hot_tier_accepts_is_fatal() {
    let mut simulator = simulator(HotBuffer::new(100, 2), ColdBuffer::new(100, 5));
    start_ingest(&mut simulator, "emu", 10, 3);

    let err = simulator.advance(1).unwrap_err();
    assert!(matches!(err, Error::IngestRateExceeded { rate: 3, max: 2, .. }));
    assert_eq!(simulator.model().buffer.hot.current_capacity, 100);
}
