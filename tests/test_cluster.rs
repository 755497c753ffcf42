use sdp_pipeline_sim::domain::pipeline_model::buffer::buffer::Buffer;
use sdp_pipeline_sim::domain::pipeline_model::buffer::cold_buffer::ColdBuffer;
use sdp_pipeline_sim::domain::pipeline_model::buffer::hot_buffer::HotBuffer;
use sdp_pipeline_sim::domain::pipeline_model::cluster::cluster::Cluster;
use sdp_pipeline_sim::domain::pipeline_model::observation::observation::Observation;
use sdp_pipeline_sim::domain::pipeline_model::observation::pipeline::PipelineTable;
use sdp_pipeline_sim::domain::pipeline_model::planner::planner::Planner;
use sdp_pipeline_sim::domain::pipeline_model::planner::static_solution::PrecomputedScheduler;
use sdp_pipeline_sim::domain::pipeline_model::planner::workflow_graph::WorkflowGraph;
use sdp_pipeline_sim::domain::pipeline_model::resource::machine::Machine;
use sdp_pipeline_sim::domain::pipeline_model::scheduler::policy::greedy::GreedyPolicy;
use sdp_pipeline_sim::domain::pipeline_model::scheduler::scheduler::Scheduler;
use sdp_pipeline_sim::domain::pipeline_model::system::SystemModel;
use sdp_pipeline_sim::domain::pipeline_model::task::task::{Task, TaskStatus};
use sdp_pipeline_sim::domain::pipeline_model::task::task_store::TaskKey;
use sdp_pipeline_sim::domain::pipeline_model::utils::id::{MachineId, ObservationId, TaskId};
use sdp_pipeline_sim::domain::simulator::simulator::{Simulator, Tick};
use sdp_pipeline_sim::error::Error;

fn simulator(machines: usize) -> Simulator {
    let cluster = Cluster::new((0..machines).map(|i| Machine::homogeneous(format!("m{}", i))).collect()).unwrap();
    let buffer = Buffer::new(HotBuffer::new(1000, 10), ColdBuffer::new(1000, 10));
    let scheduler = Scheduler::new(Box::new(GreedyPolicy), machines);
    let planner = Planner::new(Box::new(PrecomputedScheduler), None);
    Simulator::new(SystemModel::new(cluster, buffer, scheduler, planner, PipelineTable::new()))
}

fn add_task(simulator: &mut Simulator, observation: &str, node: usize, duration: Tick) -> TaskKey {
    let id = TaskId::workflow(ObservationId::new(observation), 0, node);
    simulator.model_mut().tasks.add(Task::new(id, duration, 0, duration))
}

fn allocate(simulator: &mut Simulator, task: TaskKey, machine: &str, observation: &str) -> Result<(), Error> {
    simulator.call(|env, model| {
        model.cluster.allocate_task_to_cluster(
            env,
            &mut model.tasks,
            task,
            &MachineId::new(machine),
            &ObservationId::new(observation),
            false,
        )
    })
}

#[test]
fn ingest_admission_occupies_and_returns_machines() {
    let mut simulator = simulator(10);
    let mut observation = Observation::new("emu", 1, 10, 1, "continuum", WorkflowGraph::default());
    observation.start(0).unwrap();

    assert!(simulator.model().cluster.check_ingest_capacity(5, 10));
    simulator
        .call(|env, model| model.cluster.provision_ingest_resources(env, &mut model.tasks, 5, &observation))
        .unwrap();

    simulator.advance(1).unwrap();
    let cluster = &simulator.model().cluster;
    assert_eq!(cluster.get_available_resources().len(), 5);
    assert_eq!(cluster.get_ingest_resources().len(), 5);
    assert!(cluster.pool_partition_holds());
    let finished_before = cluster.finished_tasks().len();

    simulator.advance(10).unwrap();
    let model = simulator.model();
    assert!(model.cluster.get_ingest_resources().is_empty());
    assert_eq!(model.cluster.get_available_resources().len(), 10);
    assert_eq!(model.cluster.finished_tasks().len(), finished_before + 5);
    assert!(model.cluster.is_idle());
    assert!(!model.cluster.has_running_ingest(&observation.id, &model.tasks));

    let records = model.cluster.finished_task_time_data(&model.tasks).unwrap();
    assert!(records.iter().all(|r| r.ast == Some(0) && r.aft == Some(9)));
}

#[test]
fn ingest_beyond_available_machines_is_fatal() {
    let mut simulator = simulator(3);
    let mut observation = Observation::new("emu", 1, 10, 1, "continuum", WorkflowGraph::default());
    observation.start(0).unwrap();

    assert!(!simulator.model().cluster.check_ingest_capacity(4, 10));
    let err = simulator
        .call(|env, model| model.cluster.provision_ingest_resources(env, &mut model.tasks, 4, &observation))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientMachines { requested: 4, available: 3 }));
    assert_eq!(simulator.model().cluster.get_available_resources().len(), 3);
}

#[test]
fn ingest_requires_an_admitted_observation() {
    let mut simulator = simulator(3);
    let observation = Observation::new("emu", 1, 10, 1, "continuum", WorkflowGraph::default());

    let err = simulator
        .call(|env, model| model.cluster.provision_ingest_resources(env, &mut model.tasks, 2, &observation))
        .unwrap_err();
    assert!(matches!(err, Error::ObservationNotAdmitted(_)));
}

#[test]
fn task_runs_for_its_duration_and_frees_the_machine() {
    let mut simulator = simulator(2);
    let task = add_task(&mut simulator, "emu", 0, 3);

    allocate(&mut simulator, task, "m1", "emu").unwrap();
    assert!(simulator.model().cluster.is_occupied(&MachineId::new("m1")));
    assert_eq!(simulator.model().cluster.get_occupied_resources(), vec![MachineId::new("m1")]);
    assert_eq!(simulator.model().tasks.get(task).unwrap().status(), TaskStatus::Scheduled);

    simulator.advance(1).unwrap();
    assert_eq!(simulator.model().tasks.get(task).unwrap().status(), TaskStatus::Running);
    assert_eq!(simulator.model().cluster.running_tasks(), vec![task]);

    simulator.advance(2).unwrap();
    let model = simulator.model();
    let finished = model.tasks.get(task).unwrap();
    assert!(finished.is_finished());
    assert_eq!((finished.ast, finished.aft), (Some(0), Some(2)));
    assert!(model.cluster.is_available(&MachineId::new("m1")));
    assert!(model.cluster.get_occupied_resources().is_empty());
    assert_eq!(model.cluster.finished_tasks(), &[task]);
    assert!(model.cluster.running_tasks().is_empty());
}

#[test]
fn double_allocation_is_fatal() {
    let mut simulator = simulator(2);
    let first = add_task(&mut simulator, "emu", 0, 5);
    let second = add_task(&mut simulator, "emu", 1, 5);

    allocate(&mut simulator, first, "m0", "emu").unwrap();
    let err = allocate(&mut simulator, second, "m0", "emu").unwrap_err();

    assert!(matches!(err, Error::MachineNotAllocatable { .. }));
    assert_eq!(simulator.model().tasks.get(second).unwrap().status(), TaskStatus::Unscheduled);
    assert!(simulator.model().cluster.pool_partition_holds());
}

#[test]
fn batch_reservation_is_clamped_and_keeps_its_machines() {
    let mut simulator = simulator(4);
    let obs = ObservationId::new("emu");

    assert_eq!(simulator.model_mut().cluster.provision_batch_resources(3, &obs), 3);
    assert_eq!(simulator.model_mut().cluster.provision_batch_resources(3, &obs), 1);
    assert_eq!(simulator.model().cluster.reserved_count(&obs), 4);
    assert!(simulator.model().cluster.get_available_resources().is_empty());

    let reserved = simulator.model().cluster.get_idle_resources(&obs);
    let machine = reserved[0].to_string();
    let task = add_task(&mut simulator, "emu", 0, 2);

    // Reserved machines are off limits to other observations.
    assert!(!simulator.model().cluster.can_allocate(&reserved[0], &ObservationId::new("other")));
    allocate(&mut simulator, task, &machine, "emu").unwrap();
    simulator.advance(2).unwrap();

    let cluster = &simulator.model().cluster;
    assert_eq!(cluster.get_idle_resources(&obs).len(), 4);
    assert!(cluster.get_available_resources().is_empty());
    assert!(cluster.pool_partition_holds());

    assert_eq!(simulator.model_mut().cluster.release_batch_resources(&obs), 4);
    assert_eq!(simulator.model_mut().cluster.release_batch_resources(&obs), 0);
    assert_eq!(simulator.model().cluster.get_available_resources().len(), 4);
}

#[test]
fn released_reservation_returns_busy_machines_to_available() {
    let mut simulator = simulator(2);
    let obs = ObservationId::new("emu");
    simulator.model_mut().cluster.provision_batch_resources(2, &obs);

    let task = add_task(&mut simulator, "emu", 0, 3);
    allocate(&mut simulator, task, "m0", "emu").unwrap();
    simulator.advance(1).unwrap();

    assert_eq!(simulator.model_mut().cluster.release_batch_resources(&obs), 1);
    simulator.advance(5).unwrap();

    let cluster = &simulator.model().cluster;
    assert_eq!(cluster.get_available_resources().len(), 2);
    assert!(cluster.get_idle_resources(&obs).is_empty());
    assert!(cluster.pool_partition_holds());
}
