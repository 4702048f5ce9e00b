use std::time::Duration;

use crate::error::Result;
use crate::models::{IntegerProgram, Solution};

/// Per-call solver settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveOptions {
    /// Stop searching after this long; the best incumbent (if any) is returned.
    /// Backends without a native limit stop waiting but leave their search thread running.
    pub time_limit: Option<Duration>,
    /// Let the backend print its own progress output
    pub verbose: bool,
}

impl SolveOptions {
    pub fn with_time_limit(time_limit: Option<Duration>) -> Self {
        SolveOptions {
            time_limit,
            ..Self::default()
        }
    }
}

/// Common interface for ILP solvers
pub trait Solver: Send + Sync {
    /// Solve an integer program
    ///
    /// # Arguments
    /// * `program` - The constraint polyhedron (Ax <= b with variable bounds) and objective
    /// * `options` - Time limit and output settings
    ///
    /// # Returns
    /// A solution whose status tells whether its values may be used.
    /// Infeasibility is a status, not an error; errors mean the backend itself failed.
    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> Result<Solution>;

    /// Get the solver name for logging/debugging
    fn name(&self) -> &str;
}
