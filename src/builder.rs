use std::collections::{BTreeMap, HashMap};

use crate::models::{
    IntegerProgram, IntegerSparseMatrix, Objective, Shape, SolverDirection,
    SparseLEIntegerPolyhedron, Variable,
};

/// Handle to a variable added through [`ModelBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarRef(usize);

impl VarRef {
    /// Column index of the variable in the built program
    pub fn index(self) -> usize {
        self.0
    }
}

/// Relation between the left-hand expression and the right-hand constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

/// A linear expression with integer coefficients
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    terms: Vec<(VarRef, i32)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coeff * var` to the expression
    pub fn term(mut self, var: VarRef, coeff: i32) -> Self {
        self.terms.push((var, coeff));
        self
    }

    pub fn add_term(&mut self, var: VarRef, coeff: i32) {
        self.terms.push((var, coeff));
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms with repeated variables summed and zero coefficients dropped
    fn merged(&self) -> BTreeMap<VarRef, i32> {
        let mut merged = BTreeMap::new();
        for &(var, coeff) in &self.terms {
            *merged.entry(var).or_insert(0) += coeff;
        }
        merged.retain(|_, coeff| *coeff != 0);
        merged
    }
}

impl FromIterator<(VarRef, i32)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarRef, i32)>>(iter: I) -> Self {
        LinearExpr {
            terms: iter.into_iter().collect(),
        }
    }
}

/// Builder for integer programs with a fluent-ish API
///
/// Constraints are stored as `Ax <= b` rows: `>=` rows are negated and `=`
/// rows become a pair of opposite `<=` rows.
///
/// # Example
///
/// ```
/// use logistics_flow::builder::{LinearExpr, ModelBuilder, Relation};
/// use logistics_flow::models::SolverDirection;
///
/// let mut builder = ModelBuilder::new();
/// let x = builder.add_variable("x", 0, 10);
/// let y = builder.add_binary("y");
/// builder.add_constraint(LinearExpr::new().term(x, 1).term(y, -10), Relation::Le, 0);
/// builder.set_objective(LinearExpr::new().term(y, 7), SolverDirection::Minimize);
///
/// let program = builder.build();
/// assert_eq!(program.num_variables(), 2);
/// assert_eq!(program.num_rows(), 1);
/// ```
#[derive(Debug)]
pub struct ModelBuilder {
    variables: Vec<Variable>,
    rows: Vec<i32>,
    cols: Vec<i32>,
    vals: Vec<i32>,
    b: Vec<i32>,
    objective: Objective,
    direction: SolverDirection,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        ModelBuilder {
            variables: Vec::new(),
            rows: Vec::new(),
            cols: Vec::new(),
            vals: Vec::new(),
            b: Vec::new(),
            objective: HashMap::new(),
            direction: SolverDirection::Minimize,
        }
    }

    /// Add an integer variable with inclusive bounds
    pub fn add_variable(&mut self, id: impl Into<String>, lower: i32, upper: i32) -> VarRef {
        self.variables.push(Variable::new(id, lower, upper));
        VarRef(self.variables.len() - 1)
    }

    pub fn add_binary(&mut self, id: impl Into<String>) -> VarRef {
        self.add_variable(id, 0, 1)
    }

    pub fn variable(&self, var: VarRef) -> &Variable {
        &self.variables[var.0]
    }

    pub fn num_rows(&self) -> usize {
        self.b.len()
    }

    /// Add the constraint `expr <relation> rhs`
    pub fn add_constraint(&mut self, expr: LinearExpr, relation: Relation, rhs: i32) {
        let merged = expr.merged();
        match relation {
            Relation::Le => self.push_row(&merged, 1, rhs),
            Relation::Ge => self.push_row(&merged, -1, -rhs),
            Relation::Eq => {
                self.push_row(&merged, 1, rhs);
                self.push_row(&merged, -1, -rhs);
            }
        }
    }

    fn push_row(&mut self, terms: &BTreeMap<VarRef, i32>, sign: i32, rhs: i32) {
        let row = self.b.len() as i32;
        for (var, coeff) in terms {
            self.rows.push(row);
            self.cols.push(var.0 as i32);
            self.vals.push(sign * coeff);
        }
        self.b.push(rhs);
    }

    /// Replace the objective
    pub fn set_objective(&mut self, expr: LinearExpr, direction: SolverDirection) {
        self.objective = expr
            .merged()
            .into_iter()
            .map(|(var, coeff)| (self.variables[var.0].id.clone(), coeff as f64))
            .collect();
        self.direction = direction;
    }

    pub fn build(self) -> IntegerProgram {
        let shape = Shape {
            nrows: self.b.len(),
            ncols: self.variables.len(),
        };

        IntegerProgram {
            polyhedron: SparseLEIntegerPolyhedron {
                a: IntegerSparseMatrix {
                    rows: self.rows,
                    cols: self.cols,
                    vals: self.vals,
                    shape,
                },
                b: self.b,
                variables: self.variables,
            },
            objective: self.objective,
            direction: self.direction,
        }
    }
}
