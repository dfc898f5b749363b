//! In-place arithmetic on double matrices.
//!
//! Two-operand combinators store their result in the first operand. Both
//! operands must have the same number of columns. Rows are matched by design
//! element and columns by sample (falling back to the column position when
//! the second operand lacks the sample). A row of the first operand with no
//! counterpart in the second is logged and left as it was.

use exprmat_core::{ExprMatError, Result};

use crate::dense::{BooleanMatrix, DoubleMatrix};
use crate::traits::{BulkExpressionDataMatrix, ExpressionDataMatrix};

fn check_columns<A, B>(a: &A, b: &B) -> Result<()>
where
    A: ExpressionDataMatrix,
    B: ExpressionDataMatrix,
{
    if a.columns() != b.columns() {
        return Err(ExprMatError::InvalidInput(format!(
            "unequal column counts: {} != {}",
            a.columns(),
            b.columns()
        )));
    }
    Ok(())
}

/// For each column of `a`, the column of `b` holding the same sample.
fn column_map<A, B>(a: &A, b: &B) -> Vec<usize>
where
    A: BulkExpressionDataMatrix,
    B: BulkExpressionDataMatrix,
{
    (0..a.columns())
        .map(|c| {
            a.sample_for_column(c)
                .and_then(|s| b.column_index_for_sample(s))
                .unwrap_or(c)
        })
        .collect()
}

fn combine(
    a: &mut DoubleMatrix,
    b: &DoubleMatrix,
    op: impl Fn(f64, f64) -> f64,
    verb: &str,
) -> Result<()> {
    check_columns(&*a, b)?;
    let columns = column_map(&*a, b);
    for row in 0..a.rows() {
        let element = a.design_element(row)?.clone();
        let Some(b_row) = b.row_index(&element) else {
            log::warn!("second matrix has no row for {element}; it will not be {verb}");
            continue;
        };
        for (c, &bc) in columns.iter().enumerate() {
            let value = op(a.get(row, c)?, b.get(b_row, bc)?);
            a.set(row, c, value)?;
        }
    }
    Ok(())
}

/// `a -= b`.
pub fn subtract_matrices(a: &mut DoubleMatrix, b: &DoubleMatrix) -> Result<()> {
    combine(a, b, |x, y| x - y, "subtracted")
}

/// `a += b`.
pub fn add_matrices(a: &mut DoubleMatrix, b: &DoubleMatrix) -> Result<()> {
    combine(a, b, |x, y| x + y, "added")
}

/// Divide every value by `divisor`.
pub fn scalar_divide(matrix: &mut DoubleMatrix, divisor: f64) -> Result<()> {
    if divisor == 0.0 {
        return Err(ExprMatError::InvalidInput("cannot divide by zero".into()));
    }
    for row in 0..matrix.rows() {
        for c in 0..matrix.columns() {
            let v = matrix.get(row, c)?;
            matrix.set(row, c, v / divisor)?;
        }
    }
    Ok(())
}

/// Base-2 logarithm of every value; non-positive values become NaN.
pub fn log_transform(matrix: &mut DoubleMatrix) -> Result<()> {
    for row in 0..matrix.rows() {
        for c in 0..matrix.columns() {
            let v = matrix.get(row, c)?;
            let t = if v <= 0.0 { f64::NAN } else { v.log2() };
            matrix.set(row, c, t)?;
        }
    }
    Ok(())
}

/// Blank (NaN) every value whose present/absent call is not "present".
/// Cells without a call are blanked too.
pub fn mask_matrix(matrix: &mut DoubleMatrix, calls: &BooleanMatrix) -> Result<()> {
    check_columns(&*matrix, calls)?;
    let columns = column_map(&*matrix, calls);
    for row in 0..matrix.rows() {
        let element = matrix.design_element(row)?.clone();
        let Some(call_row) = calls.row_index(&element) else {
            log::warn!("no present/absent calls for {element}; it will not be masked");
            continue;
        };
        for (c, &cc) in columns.iter().enumerate() {
            if calls.get(call_row, cc)? != Some(true) {
                matrix.set(row, c, f64::NAN)?;
            }
        }
    }
    Ok(())
}
