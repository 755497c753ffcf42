use std::str::FromStr;

use crate::domain::pipeline_model::scheduler::policy::allocation_policy::AllocationPolicy;
use crate::domain::pipeline_model::scheduler::policy::batch::BatchPolicy;
use crate::domain::pipeline_model::scheduler::policy::dynamic_plan::DynamicPlanPolicy;
use crate::domain::pipeline_model::scheduler::policy::greedy::GreedyPolicy;
use crate::error::ConversionError;

/// Batch size used when the configuration does not name one.
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// The available task allocation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyType {
    /// Ready tasks only run on the machine the static solution chose.
    DynamicPlan,
    Greedy,
    /// Per-observation machine reservation worked off as a FIFO queue.
    Batch,
}

impl PolicyType {
    /// Factory method to return a concrete [`AllocationPolicy`] for the enum variant.
    pub fn get_instance(policy_type: PolicyType, batch_size: Option<usize>) -> Box<dyn AllocationPolicy> {
        match policy_type {
            PolicyType::DynamicPlan => Box::new(DynamicPlanPolicy),
            PolicyType::Greedy => Box::new(GreedyPolicy),
            PolicyType::Batch => Box::new(BatchPolicy::new(batch_size.unwrap_or(DEFAULT_BATCH_SIZE))),
        }
    }
}

impl FromStr for PolicyType {
    type Err = ConversionError;

    fn from_str(policy: &str) -> Result<PolicyType, Self::Err> {
        match policy {
            "dynamic_plan" => Ok(PolicyType::DynamicPlan),
            "greedy" => Ok(PolicyType::Greedy),
            "batch" => Ok(PolicyType::Batch),
            _ => Err(ConversionError::UnknownPolicyType(policy.to_string())),
        }
    }
}
