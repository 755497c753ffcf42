pub mod allocation_policy;
pub mod batch;
pub mod dynamic_plan;
pub mod greedy;
pub mod policy_type;
