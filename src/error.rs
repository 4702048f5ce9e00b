use thiserror::Error;

/// Result type for model construction and solving
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or solving a logistics model
#[derive(Error, Debug)]
pub enum Error {
    /// Problem data rejected before a model was built
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The integer program itself is inconsistent
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// The solver backend failed to run (not the same as infeasibility)
    #[error("Solver {solver} failed: {details}")]
    Solver { solver: String, details: String },

    /// Environment configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to render a report as JSON
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn solver(solver: &str, details: impl std::fmt::Display) -> Self {
        Error::Solver {
            solver: solver.to_string(),
            details: details.to_string(),
        }
    }
}
