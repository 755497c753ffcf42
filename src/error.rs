use thiserror::Error;

/// Raised when a configuration string cannot be mapped onto one of the known variants.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unknown allocation policy type: {0}")]
    UnknownPolicyType(String),

    #[error("Unknown delay degree: {0}")]
    UnknownDelayDegree(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse simulation JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to write task timing table: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Conversion failed: {0}")]
    ConversionError(#[from] ConversionError),

    #[error("Failed to build internal domain model: {0}")]
    ModelConstructionError(String),

    #[error("Invalid delay model: {0}")]
    InvalidDelayModel(String),

    // Admission-precondition violations. These are caller sequencing bugs.
    #[error("Observation {0} has not been admitted (no actual start time)")]
    ObservationNotAdmitted(String),

    #[error("Observation {0} is not RUNNING, refusing to ingest data")]
    ObservationNotRunning(String),

    #[error("Observation {0} has already been admitted")]
    ObservationAlreadyAdmitted(String),

    #[error("Observation {0} has no workflow plan")]
    ObservationNotPlanned(String),

    #[error("Unknown observation: {0}")]
    UnknownObservation(String),

    #[error("Unknown pipeline type: {0}")]
    UnknownPipeline(String),

    #[error("Requested {requested} ingest machines but only {available} are available")]
    InsufficientMachines { requested: usize, available: usize },

    // Resource-pool consistency violations. These are accounting bugs in the core.
    #[error("Machine {machine} cannot be allocated to task {task}: it is not in a pool allocation may draw from")]
    MachineNotAllocatable { machine: String, task: String },

    #[error("Unknown machine: {0}")]
    UnknownMachine(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task {task} cannot move from {from} to {to}")]
    InvalidTaskTransition { task: String, from: String, to: String },

    #[error("Observation {observation} ingests {rate} per tick, hot buffer accepts at most {max}")]
    IngestRateExceeded { observation: String, rate: u64, max: u64 },

    #[error("Buffer bound violated: {0}")]
    BufferBoundViolated(String),

    #[error("Cold buffer cannot hold observation {observation} ({size} requested, {available} free)")]
    ColdCapacityExceeded { observation: String, size: u64, available: u64 },

    #[error("Transfer of observation {observation} diverged: hot residual {hot}, cold residual {cold}")]
    TransferResidualMismatch { observation: String, hot: u64, cold: u64 },

    #[error("Ingest of observation {0} still has running tasks")]
    IngestStillRunning(String),

    #[error("Static solution is incomplete: {0}")]
    IncompleteSolution(String),
}

pub type Result<T> = std::result::Result<T, Error>;
