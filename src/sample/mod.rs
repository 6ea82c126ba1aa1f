use nalgebra::*;
use crate::error::{MixtureError, Result};

/// Packs a sequence of observations into a (n x p) data matrix, one observation per row.
/// Every row must have the same (non-zero) length.
pub fn matrix_from_rows<R>(rows : &[R]) -> Result<DMatrix<f64>>
where
    R : AsRef<[f64]>
{
    let n = rows.len();
    if n == 0 {
        return Err(MixtureError::EmptyInput);
    }
    let p = rows[0].as_ref().len();
    if p == 0 {
        return Err(MixtureError::EmptyInput);
    }
    if let Some(bad) = rows.iter().find(|r| r.as_ref().len() != p ) {
        return Err(MixtureError::DimensionMismatch { expected : p, found : bad.as_ref().len() });
    }
    Ok(DMatrix::from_fn(n, p, |i, j| rows[i].as_ref()[j] ))
}

/// Verifies that the data matrix has at least one row and one column, and
/// that every entry is finite.
pub fn check_data(y : &DMatrix<f64>) -> Result<()> {
    if y.nrows() == 0 || y.ncols() == 0 {
        return Err(MixtureError::EmptyInput);
    }
    if y.iter().any(|v| !v.is_finite() ) {
        return Err(MixtureError::invalid("data", "observations must be finite"));
    }
    Ok(())
}

/// Minimum and maximum of each column of y.
pub fn column_bounds(y : &DMatrix<f64>) -> Vec<(f64, f64)> {
    y.column_iter()
        .map(|col| {
            col.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)) )
        })
        .collect()
}
