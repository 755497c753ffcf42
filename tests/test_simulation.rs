use sdp_pipeline_sim::domain::pipeline_model::buffer::buffer::Buffer;
use sdp_pipeline_sim::domain::pipeline_model::buffer::cold_buffer::ColdBuffer;
use sdp_pipeline_sim::domain::pipeline_model::buffer::hot_buffer::HotBuffer;
use sdp_pipeline_sim::domain::pipeline_model::cluster::cluster::Cluster;
use sdp_pipeline_sim::domain::pipeline_model::observation::observation::{Observation, ObservationStatus};
use sdp_pipeline_sim::domain::pipeline_model::observation::pipeline::{Pipeline, PipelineTable};
use sdp_pipeline_sim::domain::pipeline_model::planner::planner::Planner;
use sdp_pipeline_sim::domain::pipeline_model::planner::static_solution::{PrecomputedScheduler, StaticSolution};
use sdp_pipeline_sim::domain::pipeline_model::planner::workflow_graph::{WorkflowGraph, WorkflowNode};
use sdp_pipeline_sim::domain::pipeline_model::resource::machine::Machine;
use sdp_pipeline_sim::domain::pipeline_model::scheduler::policy::policy_type::PolicyType;
use sdp_pipeline_sim::domain::pipeline_model::scheduler::scheduler::Scheduler;
use sdp_pipeline_sim::domain::pipeline_model::system::{Simulation, SystemModel};
use sdp_pipeline_sim::domain::pipeline_model::utils::id::ObservationId;
use sdp_pipeline_sim::domain::pipeline_model::utils::task_time_table::write_task_time_csv;

/// Three-step chain planned on machines m1 to m3.
fn observation(name: &str, duration: u64) -> Observation {
    let graph = WorkflowGraph::new((0..3).map(WorkflowNode::new).collect(), vec![(0, 1), (1, 2)]).unwrap();
    let solution = StaticSolution::new().with(0, "m1", 0, 2).with(1, "m2", 2, 5).with(2, "m3", 5, 6);
    Observation::new(name, 1, duration, 3, "continuum", graph).with_solution(solution)
}

fn simulation(policy: &str) -> Simulation {
    let cluster = Cluster::new((0..4).map(|i| Machine::homogeneous(format!("m{}", i))).collect()).unwrap();
    let buffer = Buffer::new(HotBuffer::new(60, 3), ColdBuffer::new(80, 5));
    let policy = PolicyType::get_instance(policy.parse().unwrap(), Some(2));
    let scheduler = Scheduler::new(policy, 1);
    let planner = Planner::new(Box::new(PrecomputedScheduler), None);

    let mut pipelines = PipelineTable::new();
    pipelines.insert("continuum".to_string(), Pipeline::new("continuum", 1));

    let mut simulation = Simulation::new(SystemModel::new(cluster, buffer, scheduler, planner, pipelines));
    for (name, duration) in [("first", 10), ("second", 4), ("third", 7)] {
        simulation.add_observation(observation(name, duration)).unwrap();
    }
    simulation
}

fn run_checked(simulation: &mut Simulation, budget: u64) {
    for _ in 0..budget {
        if simulation.run(1).unwrap() {
            return;
        }
        let model = simulation.model();
        assert!(model.cluster.pool_partition_holds(), "pools diverged at t={}", simulation.now());
        assert!(model.buffer.bounds_hold(), "buffer bound violated at t={}", simulation.now());
        assert_eq!(model.cluster.machine_count(), 4);
    }
}

#[test]
fn every_policy_processes_all_observations() {
    for policy in ["dynamic_plan", "greedy", "batch"] {
        let mut simulation = simulation(policy);
        run_checked(&mut simulation, 500);
        assert!(simulation.is_finished(), "{} did not finish", policy);

        let model = simulation.model();
        for name in ["first", "second", "third"] {
            let observation = &model.observations[&ObservationId::new(name)];
            assert_eq!(observation.status, ObservationStatus::Finished);
            assert_eq!(observation.total_data_size, observation.expected_size());
            assert!(observation.plan.as_ref().unwrap().is_finished());
        }

        // 3 workflow tasks and 1 ingest task per observation
        assert_eq!(model.cluster.finished_tasks().len(), 12);
        assert!(model.buffer.is_empty());
        assert_eq!(model.buffer.cold.current_capacity, 80);
        assert_eq!(model.cluster.get_available_resources().len(), 4);
    }
}

#[test]
fn waiting_observations_are_admitted_in_arrival_order() {
    let mut simulation = simulation("greedy");
    run_checked(&mut simulation, 500);

    let start = |name: &str| simulation.model().observations[&ObservationId::new(name)].actual_start_time.unwrap();
    assert_eq!(start("first"), 0);
    // one ingest machine at a time: each admission waits for the previous ingest
    assert!(start("first") + 10 <= start("second"));
    assert!(start("second") + 4 <= start("third"));
}

#[test]
fn admission_waits_for_buffer_space() {
    let mut simulation = simulation("greedy");
    // first and second claim 42 of the 60 hot units, third needs 21
    simulation.model_mut().scheduler = Scheduler::new(PolicyType::get_instance(PolicyType::Greedy, None), 4);

    assert!(simulation.try_admit("first").unwrap());
    assert!(simulation.try_admit("second").unwrap());
    assert!(!simulation.try_admit("third").unwrap());
    assert_eq!(simulation.pending_observations(), vec![ObservationId::new("third")]);

    run_checked(&mut simulation, 500);
    assert!(simulation.is_finished());
}

#[test]
fn exhausted_budget_can_be_resumed() {
    let mut simulation = simulation("dynamic_plan");

    assert!(!simulation.run(5).unwrap());
    assert_eq!(simulation.now(), 5);
    assert!(!simulation.is_finished());

    assert!(simulation.run(500).unwrap());
    assert!(simulation.is_finished());

    let finished_at = simulation.now();
    assert!(simulation.run(10).unwrap());
    assert_eq!(simulation.now(), finished_at);
}

#[test]
fn timing_summary_lists_every_finished_task() {
    let mut simulation = simulation("greedy");
    assert!(simulation.run(500).unwrap());

    let records = simulation.finished_task_time_data().unwrap();
    assert_eq!(records.len(), 12);
    assert!(records.iter().all(|r| r.ast.is_some() && r.aft >= r.ast && r.machine.is_some()));

    let mut out = Vec::new();
    write_task_time_csv(&records, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 13);
    assert!(text.starts_with("task;observation;machine;est;eft;ast;aft;delayed\n"));
    assert!(text.contains("first_0_0;first;"));
}
