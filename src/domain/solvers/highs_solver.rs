use crate::convert::{column_entries, satisfies};
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::Result;
use crate::models::{IntegerProgram, Solution, SolverDirection, Status};

use ::highs::{ColProblem, HighsModelStatus, Sense};

/// HiGHS solver implementation
pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        HighsSolver
    }

    /// Convert HiGHS status to our status; time limits are refined by incumbent presence
    fn convert_status(model_status: HighsModelStatus) -> Status {
        match model_status {
            HighsModelStatus::Optimal => Status::Optimal,
            HighsModelStatus::Infeasible => Status::Infeasible,
            HighsModelStatus::UnboundedOrInfeasible => Status::Unbounded,
            HighsModelStatus::Unbounded => Status::Unbounded,
            HighsModelStatus::ReachedTimeLimit => Status::TimeLimit,
            _ => Status::Undefined,
        }
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for HighsSolver {
    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> Result<Solution> {
        let polyhedron = &program.polyhedron;
        let sense = match program.direction {
            SolverDirection::Maximize => Sense::Maximise,
            SolverDirection::Minimize => Sense::Minimise,
        };

        let mut problem = ColProblem::new();

        // First, add all constraint rows
        let rows: Vec<_> = polyhedron
            .b
            .iter()
            .map(|&rhs| problem.add_row(..=rhs as f64))
            .collect();

        // Add variables (columns) with their constraint coefficients
        for (col_idx, (var, entries)) in polyhedron
            .variables
            .iter()
            .zip(column_entries(polyhedron))
            .enumerate()
        {
            let (lower, upper) = var.bound;
            let row_factors: Vec<_> = entries
                .iter()
                .map(|&(row_idx, val)| (rows[row_idx], val as f64))
                .collect();

            problem.add_integer_column(
                program.objective_coefficient(col_idx),
                lower as f64..=upper as f64,
                &row_factors,
            );
        }

        let mut model = problem.optimise(sense);
        model.set_option("output_flag", options.verbose);
        if let Some(limit) = options.time_limit {
            model.set_option("time_limit", limit.as_secs_f64());
        }
        let solved = model.solve();

        let mut status = Self::convert_status(solved.status());
        if !matches!(status, Status::Optimal | Status::TimeLimit) {
            return Ok(Solution::without_incumbent(status));
        }

        let solution_values = solved.get_solution();
        let values: Vec<i64> = (0..polyhedron.variables.len())
            .map(|col_idx| {
                solution_values
                    .columns()
                    .get(col_idx)
                    .copied()
                    .unwrap_or(0.0)
                    .round() as i64
            })
            .collect();

        if status == Status::TimeLimit {
            // Column values after a time limit are only an incumbent if they are feasible
            if !satisfies(polyhedron, &values) {
                return Ok(Solution::without_incumbent(Status::TimeLimit));
            }
            status = Status::Feasible;
        }

        Ok(Solution::from_values(program, status, &values))
    }

    fn name(&self) -> &str {
        "HiGHS"
    }
}
