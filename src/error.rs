//! Crate-wide error type.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CorrectionError>;

#[derive(Error, Debug)]
pub enum CorrectionError {
    /// The synthetic control builder cannot produce a usable composite.
    #[error("Cannot compose synthetic control '{name}': {reason}")]
    Composition { name: String, reason: String },

    /// The correction graph contains a cycle. The first node is repeated at the end.
    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Node '{node}' depends on unknown dataset '{dependency}'")]
    UnknownDependency { node: String, dependency: String },

    #[error("Node '{node}' is declared more than once")]
    DuplicateNode { node: String },

    #[error("Unsupported matching configuration: {0}")]
    MatchingConfiguration(String),

    #[error("Particle id '{id}' occurs more than once in table '{table}'")]
    DuplicateParticleId { table: String, id: String },

    #[error("No dataset is registered for node '{0}'")]
    MissingDataset(String),

    #[error("Node '{node}' skipped: control '{control}' failed")]
    Upstream { node: String, control: String },

    #[error("Dataset '{0}' is already registered")]
    DuplicateDataset(String),

    #[error("Output for node '{0}' was already written")]
    OutputAlreadyWritten(String),

    #[error("Particle '{id}' has an analysed fraction of {fraction}, expected a value in (0, 1]")]
    InvalidFraction { id: String, fraction: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
