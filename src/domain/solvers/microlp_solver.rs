use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use log::{debug, warn};
use microlp::{ComparisonOp, OptimizationDirection, Problem};

use crate::convert::row_entries;
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::{Error, Result};
use crate::models::{IntegerProgram, Solution, SolverDirection, Status};

const NAME: &str = "microlp";

/// Pure-Rust branch-and-bound solver; always available
pub struct MicrolpSolver;

impl MicrolpSolver {
    pub fn new() -> Self {
        MicrolpSolver
    }

    fn solve_blocking(program: &IntegerProgram) -> Result<Solution> {
        let direction = match program.direction {
            SolverDirection::Maximize => OptimizationDirection::Maximize,
            SolverDirection::Minimize => OptimizationDirection::Minimize,
        };
        let mut problem = Problem::new(direction);

        // Objective coefficients are attached when the columns are created
        let mut vars = Vec::with_capacity(program.num_variables());
        for (col, var) in program.polyhedron.variables.iter().enumerate() {
            let coeff = program.objective_coefficient(col);
            let handle = if var.is_binary() {
                problem.add_binary_var(coeff)
            } else {
                problem.add_integer_var(coeff, var.bound)
            };
            vars.push(handle);
        }

        for (entries, &rhs) in row_entries(&program.polyhedron)
            .iter()
            .zip(&program.polyhedron.b)
        {
            let terms: Vec<(microlp::Variable, f64)> = entries
                .iter()
                .map(|&(col, val)| (vars[col], val as f64))
                .collect();
            problem.add_constraint(terms, ComparisonOp::Le, rhs as f64);
        }

        match problem.solve() {
            Ok(solved) => {
                let values: Vec<i64> = vars
                    .iter()
                    .map(|&var| solved.var_value(var).round() as i64)
                    .collect();
                Ok(Solution::from_values(program, Status::Optimal, &values))
            }
            Err(microlp::Error::Infeasible) => Ok(Solution::without_incumbent(Status::Infeasible)),
            Err(microlp::Error::Unbounded) => Ok(Solution::without_incumbent(Status::Unbounded)),
            Err(error) => Err(Error::solver(NAME, error)),
        }
    }
}

impl Default for MicrolpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for MicrolpSolver {
    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> Result<Solution> {
        if options.verbose {
            debug!("{} has no console output; progress is logged at trace level", NAME);
        }

        let Some(limit) = options.time_limit else {
            return Self::solve_blocking(program);
        };

        // No native time limit: search on a worker and stop waiting once the limit expires
        let (tx, rx) = mpsc::channel();
        let owned = program.clone();
        thread::Builder::new()
            .name("microlp-search".to_string())
            .spawn(move || {
                let result = Self::solve_blocking(&owned);
                if tx.send(result).is_err() {
                    debug!("{} search finished after the caller stopped waiting; result dropped", NAME);
                }
            })
            .map_err(|e| Error::solver(NAME, e))?;

        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // the worker cannot be interrupted; it runs to completion in the background
                warn!("{} reached the {:?} time limit without an incumbent", NAME, limit);
                Ok(Solution::without_incumbent(Status::TimeLimit))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::solver(NAME, "search thread stopped without a result"))
            }
        }
    }

    fn name(&self) -> &str {
        NAME
    }
}
