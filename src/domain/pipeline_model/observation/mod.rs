pub mod observation;
pub mod pipeline;
