pub mod config;
pub mod core;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod persistence;
pub mod random;
pub mod scenario;
pub mod test_util;
