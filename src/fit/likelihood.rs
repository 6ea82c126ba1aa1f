use nalgebra::*;
use crate::error::{MixtureError, Result};
use crate::prob::{Gaussian, MixtureParams};

/// Total log-likelihood of the rows of y under the mixture:
///
/// Σ_i ln Σ_k w_k N(y_i | μ_k, Σ_k)
///
/// An observation to which every component assigns zero density contributes -inf.
pub fn log_likelihood(y : &DMatrix<f64>, params : &MixtureParams) -> Result<f64> {
    if y.ncols() != params.dim() {
        return Err(MixtureError::DimensionMismatch { expected : params.dim(), found : y.ncols() });
    }
    let components = params.components()?;
    Ok(log_likelihood_with(y, &components[..], params.weights()))
}

/// Same as log_likelihood, but re-uses components already built for the current
/// parameters.
pub(crate) fn log_likelihood_with(y : &DMatrix<f64>, components : &[Gaussian], weights : &DVector<f64>) -> f64 {
    y.row_iter()
        .map(|row| {
            let x = row.transpose();
            components.iter()
                .zip(weights.iter())
                .map(|(g, w)| w * g.prob(&x) )
                .sum::<f64>()
                .ln()
        })
        .sum()
}
