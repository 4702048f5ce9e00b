use crate::convert::row_entries;
use crate::domain::solver::{SolveOptions, Solver};
use crate::error::{Error, Result};
use crate::models::{IntegerProgram, Solution, SolverDirection, Status};

use grb::prelude::*;

const NAME: &str = "Gurobi";

/// Gurobi solver implementation
pub struct GurobiSolver;

impl GurobiSolver {
    pub fn new() -> Self {
        GurobiSolver
    }

    /// Convert Gurobi status to our status; time limits are refined by incumbent presence
    fn convert_status(status: grb::Status) -> Status {
        match status {
            grb::Status::Optimal => Status::Optimal,
            grb::Status::Infeasible => Status::Infeasible,
            grb::Status::InfOrUnbd | grb::Status::Unbounded => Status::Unbounded,
            grb::Status::TimeLimit => Status::TimeLimit,
            _ => Status::Undefined,
        }
    }
}

impl Default for GurobiSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for GurobiSolver {
    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> Result<Solution> {
        let polyhedron = &program.polyhedron;
        let sense = match program.direction {
            SolverDirection::Maximize => ModelSense::Maximize,
            SolverDirection::Minimize => ModelSense::Minimize,
        };

        let mut env = Env::new("").map_err(|e| Error::solver(NAME, format!("environment: {}", e)))?;

        // Console output only when asked for
        env.set(param::OutputFlag, if options.verbose { 1 } else { 0 })
            .map_err(|e| Error::solver(NAME, format!("output flag: {}", e)))?;

        if let Some(limit) = options.time_limit {
            env.set(param::TimeLimit, limit.as_secs_f64())
                .map_err(|e| Error::solver(NAME, format!("time limit: {}", e)))?;
        }

        let mut model = Model::with_env("logistics", &env)
            .map_err(|e| Error::solver(NAME, format!("model: {}", e)))?;

        let mut vars: Vec<Var> = Vec::with_capacity(polyhedron.variables.len());
        for var in &polyhedron.variables {
            let (lower, upper) = var.bound;

            // Binary variables are optimized more efficiently by Gurobi
            let gurobi_var = if var.is_binary() {
                add_binvar!(model, name: &var.id)
            } else {
                add_intvar!(model, name: &var.id, bounds: lower as f64..upper as f64)
            }
            .map_err(|e| Error::solver(NAME, format!("variable {}: {}", var.id, e)))?;

            vars.push(gurobi_var);
        }

        model
            .update()
            .map_err(|e| Error::solver(NAME, format!("update after variables: {}", e)))?;

        // Add constraints (Ax <= b)
        for (row_idx, (entries, &rhs)) in row_entries(polyhedron)
            .iter()
            .zip(&polyhedron.b)
            .enumerate()
        {
            let expr = entries.iter().fold(Expr::Constant(0.0), |acc, &(col_idx, coeff)| {
                acc + (coeff as f64) * vars[col_idx]
            });

            let constraint_name = format!("c{}", row_idx);
            model
                .add_constr(&constraint_name, c!(expr <= rhs as f64))
                .map_err(|e| Error::solver(NAME, format!("constraint {}: {}", row_idx, e)))?;
        }

        let obj_expr = vars
            .iter()
            .enumerate()
            .fold(Expr::Constant(0.0), |acc, (idx, &var)| {
                let coeff = program.objective_coefficient(idx);
                if coeff != 0.0 {
                    acc + coeff * var
                } else {
                    acc
                }
            });

        model
            .set_objective(obj_expr, sense)
            .map_err(|e| Error::solver(NAME, format!("objective: {}", e)))?;

        model
            .optimize()
            .map_err(|e| Error::solver(NAME, format!("optimize: {}", e)))?;

        let model_status = model
            .status()
            .map_err(|e| Error::solver(NAME, format!("status: {}", e)))?;
        let mut status = Self::convert_status(model_status);

        if status == Status::TimeLimit {
            let incumbents = model
                .get_attr(attr::SolCount)
                .map_err(|e| Error::solver(NAME, format!("solution count: {}", e)))?;
            if incumbents == 0 {
                return Ok(Solution::without_incumbent(Status::TimeLimit));
            }
            status = Status::Feasible;
        } else if status != Status::Optimal {
            return Ok(Solution::without_incumbent(status));
        }

        let mut values: Vec<i64> = Vec::with_capacity(vars.len());
        for var in &vars {
            let value = model
                .get_obj_attr(attr::X, var)
                .map_err(|e| Error::solver(NAME, format!("values: {}", e)))?;
            values.push(value.round() as i64);
        }

        Ok(Solution::from_values(program, status, &values))
    }

    fn name(&self) -> &str {
        NAME
    }
}
