pub mod distribution_generator;
pub mod expression;
pub mod flavor_builder;
pub mod optimizer;
pub mod usage_builder;
pub mod usage_profile;
pub mod vm;
pub mod vm_usage_builder;
pub mod workload_builder;
pub mod workload_profile;
