pub mod distribution;
pub mod interface;
pub mod usage;
pub mod workload;
