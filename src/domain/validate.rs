use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{IntegerProgram, Objective, SparseLEIntegerPolyhedron, Variable};

pub fn validate_program(program: &IntegerProgram) -> Result<()> {
    validate_polyhedron(&program.polyhedron)?;
    validate_objective(&program.polyhedron.variables, &program.objective)
}

pub fn validate_polyhedron(polyhedron: &SparseLEIntegerPolyhedron) -> Result<()> {
    let a = &polyhedron.a;
    if a.rows.len() != a.cols.len() || a.rows.len() != a.vals.len() {
        return Err(Error::InvalidModel(format!(
            "Matrix has {} row indices, {} column indices and {} values",
            a.rows.len(),
            a.cols.len(),
            a.vals.len(),
        )));
    }
    if polyhedron.b.len() != a.shape.nrows {
        return Err(Error::InvalidModel(format!(
            "Right-hand side has {} entries for {} rows",
            polyhedron.b.len(),
            a.shape.nrows,
        )));
    }
    if polyhedron.variables.len() != a.shape.ncols {
        return Err(Error::InvalidModel(format!(
            "{} variables for {} columns",
            polyhedron.variables.len(),
            a.shape.ncols,
        )));
    }
    for (&row, &col) in a.rows.iter().zip(&a.cols) {
        if row < 0 || row as usize >= a.shape.nrows || col < 0 || col as usize >= a.shape.ncols {
            return Err(Error::InvalidModel(format!(
                "Entry ({}, {}) outside of {}x{} matrix",
                row, col, a.shape.nrows, a.shape.ncols,
            )));
        }
    }
    for variable in &polyhedron.variables {
        let (lower, upper) = variable.bound;
        if lower > upper {
            return Err(Error::InvalidModel(format!(
                "Variable {} has lower bound {} above upper bound {}",
                variable.id, lower, upper,
            )));
        }
    }
    Ok(())
}

pub fn validate_objective(variables: &[Variable], objective: &Objective) -> Result<()> {
    let variable_ids: HashSet<&str> = variables.iter().map(|v| v.id.as_str()).collect();

    for objective_variable in objective.keys() {
        if !variable_ids.contains(objective_variable.as_str()) {
            return Err(Error::InvalidModel(format!(
                "Objective contains missing variable {}",
                objective_variable,
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{LinearExpr, ModelBuilder, Relation};
    use crate::models::SolverDirection;
    use std::collections::HashMap;

    fn valid_program() -> IntegerProgram {
        let mut builder = ModelBuilder::new();
        let x1 = builder.add_binary("x1");
        let x2 = builder.add_binary("x2");
        builder.add_constraint(LinearExpr::new().term(x1, 1).term(x2, 1), Relation::Le, 1);
        builder.set_objective(LinearExpr::new().term(x1, 1).term(x2, 2), SolverDirection::Maximize);
        builder.build()
    }

    #[test]
    fn test_validate_program_given_valid_program_should_return_ok() {
        assert!(validate_program(&valid_program()).is_ok());
    }

    #[test]
    fn test_validate_objective_given_missing_variable_should_return_error() {
        let variables = vec![Variable::new("x1", 0, 1), Variable::new("x2", 0, 1)];
        let objective = HashMap::from([("x1".to_string(), 1.0), ("missing".to_string(), 2.0)]);
        assert!(matches!(
            validate_objective(&variables, &objective),
            Err(Error::InvalidModel(_))
        ));
    }

    #[test]
    fn test_validate_polyhedron_given_inverted_bound_should_return_error() {
        let mut program = valid_program();
        program.polyhedron.variables[0].bound = (3, 1);
        assert!(validate_program(&program).is_err());
    }

    #[test]
    fn test_validate_polyhedron_given_out_of_range_column_should_return_error() {
        let mut program = valid_program();
        program.polyhedron.a.cols[1] = 7;
        assert!(validate_program(&program).is_err());
    }

    #[test]
    fn test_validate_polyhedron_given_short_rhs_should_return_error() {
        let mut program = valid_program();
        program.polyhedron.b.clear();
        assert!(validate_program(&program).is_err());
    }
}
