use crate::models::{IntegerProgram, IntegerSparseMatrix, SparseLEIntegerPolyhedron};

#[cfg(feature = "glpk-solver")]
use glpk_rust::{
    Bound, IntegerSparseMatrix as GlpkMatrix, SparseLEIntegerPolyhedron as GlpkPoly,
    Variable as GlpkVar,
};

/// Group the COO entries of `A` by row: `rows[r] = [(col, val), ...]`
pub fn row_entries(polyhedron: &SparseLEIntegerPolyhedron) -> Vec<Vec<(usize, i32)>> {
    let a = &polyhedron.a;
    let mut row_data: Vec<Vec<(usize, i32)>> = vec![Vec::new(); a.shape.nrows];
    for i in 0..a.rows.len() {
        let row = a.rows[i] as usize;
        let col = a.cols[i] as usize;
        if row < a.shape.nrows && col < a.shape.ncols {
            row_data[row].push((col, a.vals[i]));
        }
    }
    row_data
}

/// Group the COO entries of `A` by column: `cols[c] = [(row, val), ...]`
pub fn column_entries(polyhedron: &SparseLEIntegerPolyhedron) -> Vec<Vec<(usize, i32)>> {
    let a = &polyhedron.a;
    let mut col_data: Vec<Vec<(usize, i32)>> = vec![Vec::new(); a.shape.ncols];
    for i in 0..a.rows.len() {
        let row = a.rows[i] as usize;
        let col = a.cols[i] as usize;
        if row < a.shape.nrows && col < a.shape.ncols {
            col_data[col].push((row, a.vals[i]));
        }
    }
    col_data
}

/// Remove rows without coefficients.
///
/// An empty row reads `0 <= b`; returns `None` when any such row has `b < 0`,
/// i.e. the program is infeasible as stated.
pub fn drop_empty_rows(program: &IntegerProgram) -> Option<IntegerProgram> {
    let row_data = row_entries(&program.polyhedron);
    if row_data
        .iter()
        .zip(&program.polyhedron.b)
        .any(|(entries, &rhs)| entries.is_empty() && rhs < 0)
    {
        return None;
    }

    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();
    let mut b = Vec::new();
    for (entries, &rhs) in row_data.iter().zip(&program.polyhedron.b) {
        if entries.is_empty() {
            continue;
        }
        let row = b.len() as i32;
        for &(col, val) in entries {
            rows.push(row);
            cols.push(col as i32);
            vals.push(val);
        }
        b.push(rhs);
    }

    let mut pruned = program.clone();
    pruned.polyhedron.a = IntegerSparseMatrix {
        rows,
        cols,
        vals,
        shape: crate::models::Shape {
            nrows: b.len(),
            ncols: program.polyhedron.a.shape.ncols,
        },
    };
    pruned.polyhedron.b = b;
    Some(pruned)
}

/// Check integer values against bounds and every `Ax <= b` row.
pub fn satisfies(polyhedron: &SparseLEIntegerPolyhedron, values: &[i64]) -> bool {
    if values.len() != polyhedron.variables.len() {
        return false;
    }
    let within_bounds = polyhedron
        .variables
        .iter()
        .zip(values)
        .all(|(var, &value)| var.bound.0 as i64 <= value && value <= var.bound.1 as i64);

    within_bounds
        && row_entries(polyhedron)
            .iter()
            .zip(&polyhedron.b)
            .all(|(entries, &rhs)| {
                let lhs: i64 = entries
                    .iter()
                    .map(|&(col, val)| val as i64 * values[col])
                    .sum();
                lhs <= rhs as i64
            })
}

/// Convert an LE polyhedron to a GLPK LE polyhedron by building borrowed variables.
#[cfg(feature = "glpk-solver")]
pub fn to_glpk_polyhedron(le: &SparseLEIntegerPolyhedron) -> GlpkPoly<'_> {
    let a = GlpkMatrix {
        rows: le.a.rows.clone(),
        cols: le.a.cols.clone(),
        vals: le.a.vals.clone(),
    };
    let b: Vec<Bound> = le.b.iter().map(|&v| (0, v)).collect();

    let variables: Vec<GlpkVar<'_>> = le
        .variables
        .iter()
        .map(|v| GlpkVar {
            id: v.id.as_str(),
            bound: v.bound,
        })
        .collect();

    GlpkPoly {
        a,
        b,
        variables,
        double_bound: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{LinearExpr, ModelBuilder, Relation};
    use crate::models::SolverDirection;

    fn program_with_empty_row(rhs: i32) -> IntegerProgram {
        let mut builder = ModelBuilder::new();
        let x = builder.add_variable("x", 0, 4);
        builder.add_constraint(LinearExpr::new(), Relation::Le, rhs);
        builder.add_constraint(LinearExpr::new().term(x, 1), Relation::Le, 3);
        builder.set_objective(LinearExpr::new().term(x, 1), SolverDirection::Maximize);
        builder.build()
    }

    #[test]
    fn test_drop_empty_rows_keeps_satisfied_program() {
        let pruned = drop_empty_rows(&program_with_empty_row(0)).unwrap();
        assert_eq!(pruned.num_rows(), 1);
        assert_eq!(pruned.polyhedron.a.rows, vec![0]);
        assert_eq!(pruned.polyhedron.b, vec![3]);
    }

    #[test]
    fn test_drop_empty_rows_detects_violated_row() {
        assert!(drop_empty_rows(&program_with_empty_row(-1)).is_none());
    }

    #[test]
    fn test_satisfies_checks_rows_and_bounds() {
        let program = program_with_empty_row(0);
        assert!(satisfies(&program.polyhedron, &[3]));
        assert!(!satisfies(&program.polyhedron, &[4]));
        assert!(!satisfies(&program.polyhedron, &[-1]));
    }

    #[test]
    fn test_column_entries_transposes_rows() {
        let mut builder = ModelBuilder::new();
        let x = builder.add_variable("x", 0, 4);
        let y = builder.add_variable("y", 0, 4);
        builder.add_constraint(LinearExpr::new().term(x, 1).term(y, 2), Relation::Le, 5);
        builder.add_constraint(LinearExpr::new().term(y, 3), Relation::Le, 6);
        let program = builder.build();

        let cols = column_entries(&program.polyhedron);
        assert_eq!(cols[0], vec![(0, 1)]);
        assert_eq!(cols[1], vec![(0, 2), (1, 3)]);
    }
}
