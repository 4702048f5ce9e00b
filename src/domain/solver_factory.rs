use crate::domain::solver::Solver;
use crate::domain::solvers::MicrolpSolver;

#[cfg(feature = "glpk-solver")]
use crate::domain::solvers::GlpkSolver;

#[cfg(feature = "highs-solver")]
use crate::domain::solvers::HighsSolver;

#[cfg(feature = "gurobi-solver")]
use crate::domain::solvers::GurobiSolver;

/// Available solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverType {
    #[default]
    Microlp,
    #[cfg(feature = "glpk-solver")]
    Glpk,
    #[cfg(feature = "highs-solver")]
    Highs,
    #[cfg(feature = "gurobi-solver")]
    Gurobi,
}

impl SolverType {
    /// Parse solver type from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "microlp" => Some(SolverType::Microlp),
            #[cfg(feature = "glpk-solver")]
            "glpk" => Some(SolverType::Glpk),
            #[cfg(feature = "highs-solver")]
            "highs" => Some(SolverType::Highs),
            #[cfg(feature = "gurobi-solver")]
            "gurobi" => Some(SolverType::Gurobi),
            _ => None,
        }
    }
}

/// Create a solver instance based on the specified type
pub fn create_solver(solver_type: SolverType) -> Box<dyn Solver> {
    match solver_type {
        SolverType::Microlp => Box::new(MicrolpSolver::new()),
        #[cfg(feature = "glpk-solver")]
        SolverType::Glpk => Box::new(GlpkSolver::new()),
        #[cfg(feature = "highs-solver")]
        SolverType::Highs => Box::new(HighsSolver::new()),
        #[cfg(feature = "gurobi-solver")]
        SolverType::Gurobi => Box::new(GurobiSolver::new()),
    }
}
