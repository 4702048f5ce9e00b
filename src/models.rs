use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------- Solver-neutral integer program: Ax <= b over bounded integers ----------

/// Inclusive integer bounds (lower, upper)
pub type Bound = (i32, i32);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: String,
    pub bound: Bound,
}

impl Variable {
    pub fn new(id: impl Into<String>, lower: i32, upper: i32) -> Self {
        Self {
            id: id.into(),
            bound: (lower, upper),
        }
    }

    pub fn is_binary(&self) -> bool {
        self.bound == (0, 1)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Shape {
    pub nrows: usize,
    pub ncols: usize,
}

/// Sparse matrix in coordinate format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IntegerSparseMatrix {
    pub rows: Vec<i32>,
    pub cols: Vec<i32>,
    pub vals: Vec<i32>,
    pub shape: Shape,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SparseLEIntegerPolyhedron {
    #[serde(rename = "A")]
    pub a: IntegerSparseMatrix,
    pub b: Vec<i32>, // LE right-hand side
    pub variables: Vec<Variable>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SolverDirection {
    Maximize,
    Minimize,
}

pub type Objective = HashMap<String, f64>;

/// A single-objective integer program handed to a solver backend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IntegerProgram {
    pub polyhedron: SparseLEIntegerPolyhedron,
    pub objective: Objective,
    pub direction: SolverDirection,
}

impl IntegerProgram {
    pub fn num_variables(&self) -> usize {
        self.polyhedron.variables.len()
    }

    pub fn num_rows(&self) -> usize {
        self.polyhedron.a.shape.nrows
    }

    /// Objective coefficient of the variable at `col`, zero when absent.
    pub fn objective_coefficient(&self, col: usize) -> f64 {
        self.polyhedron
            .variables
            .get(col)
            .and_then(|v| self.objective.get(&v.id))
            .copied()
            .unwrap_or(0.0)
    }
}

// ---------- Solver results ----------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Proven optimal
    Optimal,
    /// Incumbent found without an optimality proof (e.g. time limit hit)
    Feasible,
    /// Time limit hit before any incumbent was found
    TimeLimit,
    Infeasible,
    Unbounded,
    Undefined,
}

impl Status {
    /// Whether values attached to this status may be reported
    pub fn is_usable(self) -> bool {
        matches!(self, Status::Optimal | Status::Feasible)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Solution {
    pub status: Status,
    pub objective: i64,
    pub solution: HashMap<String, i64>,
    pub error: Option<String>,
}

impl Solution {
    /// A result carrying only a status, e.g. infeasible or timed out.
    pub fn without_incumbent(status: Status) -> Self {
        Solution {
            status,
            objective: 0,
            solution: HashMap::new(),
            error: None,
        }
    }

    /// Build a solution from per-column values, computing the objective from the program.
    pub fn from_values(program: &IntegerProgram, status: Status, values: &[i64]) -> Self {
        let mut solution = HashMap::with_capacity(values.len());
        let mut objective = 0.0;
        for (col, (var, &value)) in program.polyhedron.variables.iter().zip(values).enumerate() {
            objective += program.objective_coefficient(col) * value as f64;
            solution.insert(var.id.clone(), value);
        }

        Solution {
            status,
            objective: objective.round() as i64,
            solution,
            error: None,
        }
    }

    pub fn has_incumbent(&self) -> bool {
        !self.solution.is_empty()
    }

    /// Value of a variable by id, zero when the solver did not report it.
    pub fn value(&self, id: &str) -> i64 {
        self.solution.get(id).copied().unwrap_or(0)
    }
}
