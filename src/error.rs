//! Error type shared by every stage of the generator.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("i/o error ({0})")]
    Io(#[from] std::io::Error),

    #[error("failed to parse yaml document ({0})")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to (de)serialize json ({0})")]
    Json(#[from] serde_json::Error),

    /// A required construction parameter was not provided
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// Usage or workload frequencies add up to more than one
    #[error("{document} frequency sum must not exceed 1 (got {sum})")]
    FrequencyOverflow { document: &'static str, sum: f64 },

    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("{0} scenario declares no entry")]
    EmptyScenario(&'static str),

    #[error("invalid temporality: {0}")]
    InvalidTemporality(String),

    #[error("invalid expression {expression:?}: {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// Arrival based growth was requested before the profile ever saw a VM
    #[error("initial vm count of profile {0:?} could not be inferred")]
    ProfileNotObserved(String),

    #[error("unknown usage profile {0:?}")]
    UnknownProfile(String),

    #[error("invalid output target {0:?}")]
    InvalidOutputTarget(String),
}
