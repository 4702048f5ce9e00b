use std::time::Instant;

use log::{debug, info, warn};

use crate::convert::drop_empty_rows;
use crate::domain::solver::{SolveOptions, Solver};
use crate::domain::validate::validate_program;
use crate::error::Result;
use crate::models::{IntegerProgram, Solution, Status};

/// Validate a program, prune constant rows and hand it to the solver.
pub fn solve(
    solver: &dyn Solver,
    program: &IntegerProgram,
    options: &SolveOptions,
) -> Result<Solution> {
    validate_program(program)?;

    let pruned = match drop_empty_rows(program) {
        Some(pruned) => pruned,
        None => {
            warn!("Model contains a constant row that can never hold; skipping {}", solver.name());
            return Ok(Solution::without_incumbent(Status::Infeasible));
        }
    };

    debug!(
        "Solving with {}: {} variables, {} rows ({} nonzeros), time limit {:?}",
        solver.name(),
        pruned.num_variables(),
        pruned.num_rows(),
        pruned.polyhedron.a.vals.len(),
        options.time_limit,
    );

    let started = Instant::now();
    let solution = solver.solve(&pruned, options)?;
    info!(
        "{} finished with status {:?} (objective {}) in {:.2?}",
        solver.name(),
        solution.status,
        solution.objective,
        started.elapsed(),
    );

    Ok(solution)
}
