use std::collections::HashMap;

use log::warn;

use crate::convert::to_glpk_polyhedron;
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::Result;
use crate::models::{IntegerProgram, Solution, SolverDirection, Status};

use glpk_rust::{solve_ilps as glpk_solve_ilps, Status as GlpkStatus};

/// GLPK solver implementation
pub struct GlpkSolver;

impl GlpkSolver {
    pub fn new() -> Self {
        GlpkSolver
    }

    fn convert_status(status: GlpkStatus) -> Status {
        match status {
            GlpkStatus::Optimal => Status::Optimal,
            GlpkStatus::Feasible => Status::Feasible,
            GlpkStatus::Infeasible | GlpkStatus::NoFeasible | GlpkStatus::EmptySpace => {
                Status::Infeasible
            }
            GlpkStatus::Unbounded => Status::Unbounded,
            _ => Status::Undefined,
        }
    }
}

impl Default for GlpkSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for GlpkSolver {
    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> Result<Solution> {
        if let Some(limit) = options.time_limit {
            warn!("GLPK backend ignores the {:?} time limit", limit);
        }

        // Solver expects &mut
        let mut glpk_polyhedron = to_glpk_polyhedron(&program.polyhedron);

        let objective: HashMap<&str, f64> = program
            .objective
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        let maximize = program.direction == SolverDirection::Maximize;

        let lib_solutions = glpk_solve_ilps(
            &mut glpk_polyhedron,
            vec![objective],
            maximize,
            options.verbose,
        );

        let Some(lib_solution) = lib_solutions.into_iter().next() else {
            return Ok(Solution::without_incumbent(Status::Undefined));
        };

        let status = Self::convert_status(lib_solution.status);
        if !status.is_usable() {
            let mut solution = Solution::without_incumbent(status);
            solution.error = lib_solution.error;
            return Ok(solution);
        }

        let values: Vec<i64> = program
            .polyhedron
            .variables
            .iter()
            .map(|var| {
                lib_solution
                    .solution
                    .get(var.id.as_str())
                    .copied()
                    .unwrap_or(0)
            })
            .collect();

        let mut solution = Solution::from_values(program, status, &values);
        solution.error = lib_solution.error;
        Ok(solution)
    }

    fn name(&self) -> &str {
        "GLPK"
    }
}
