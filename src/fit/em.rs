use nalgebra::*;
use serde::{Serialize, Deserialize};
use crate::error::{MixtureError, Result};
use crate::prob::{Gaussian, MixtureParams};
use super::likelihood::log_likelihood_with;

/// State of the EM iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmStatus {

    /// Parameters are set but no iteration was performed.
    Initialized,

    Iterating,

    /// The absolute log-likelihood change at the informed loop index fell below the tolerance.
    Converged { iteration : usize },

    /// max_iter iterations were performed without reaching the tolerance.
    BudgetExhausted

}

/// The expectation maximization algorithm for Gaussian mixtures alternates between
/// computing the posterior probability that each component generated each observation
/// (responsibilities; E-step) and re-estimating means, covariances and weights as
/// responsibility-weighted averages (M-step). Each iteration can only increase the data
/// log-likelihood, which is used as the convergence signal.
///
/// # References
/// Dempster, A. P., Laird, N. M., & Rubin, D. B.
/// ([1977](https://rss.onlinelibrary.wiley.com/doi/abs/10.1111/j.2517-6161.1977.tb01600.x)).
/// Maximum Likelihood from Incomplete Data
/// Via the EM Algorithm. Journal of the Royal Statistical Society: Series B (Methodological),
/// 39(1), 1–22. doi: 10.1111/j.2517-6161.1977.tb01600.x
#[derive(Debug)]
pub struct ExpectMax<'a> {

    y : &'a DMatrix<f64>,

    params : MixtureParams,

    status : EmStatus,

    /// Log-likelihood of the initial parameters, followed by the log-likelihood after each iteration.
    trace : Vec<f64>

}

impl<'a> ExpectMax<'a> {

    pub fn new(y : &'a DMatrix<f64>, init : MixtureParams) -> Result<Self> {
        if y.nrows() == 0 {
            return Err(MixtureError::EmptyInput);
        }
        if y.ncols() != init.dim() {
            return Err(MixtureError::DimensionMismatch { expected : init.dim(), found : y.ncols() });
        }
        Ok(Self { y, params : init, status : EmStatus::Initialized, trace : Vec::new() })
    }

    /// Iterates until the absolute change in log-likelihood is smaller than tol, or
    /// until max_iter iterations. Returns the loop index at which convergence was
    /// detected (zero-based), or max_iter if the budget was exhausted.
    pub fn run(&mut self, max_iter : usize, tol : f64) -> Result<usize> {
        // Always built from the current self.params (read by the log-likelihood and the next E-step).
        let mut components = self.params.components()?;
        let mut lp = log_likelihood_with(self.y, &components[..], self.params.weights());
        self.trace.push(lp);
        self.status = EmStatus::Iterating;

        for iter in 0..max_iter {
            let resp = responsibilities(self.y, &components[..], self.params.weights())?;
            self.params = maximization_step(self.y, &resp)?;
            components = self.params.components()?;
            let new_lp = log_likelihood_with(self.y, &components[..], self.params.weights());
            self.trace.push(new_lp);
            tracing::debug!(iteration = iter, log_likelihood = new_lp, delta = new_lp - lp, "EM step");
            if (lp - new_lp).abs() < tol {
                tracing::info!(iteration = iter, log_likelihood = new_lp, "EM converged");
                self.status = EmStatus::Converged { iteration : iter };
                return Ok(iter);
            }
            lp = new_lp;
        }

        tracing::info!(max_iter, log_likelihood = lp, "EM iteration budget exhausted");
        self.status = EmStatus::BudgetExhausted;
        Ok(max_iter)
    }

    pub fn params(&self) -> &MixtureParams {
        &self.params
    }

    pub fn status(&self) -> EmStatus {
        self.status
    }

    pub fn trace(&self) -> &[f64] {
        &self.trace[..]
    }

    /// Consumes the engine, returning the final parameters, status and log-likelihood trace.
    pub fn finish(self) -> (MixtureParams, EmStatus, Vec<f64>) {
        (self.params, self.status, self.trace)
    }

}

/// Computes the (n x k) responsibility matrix:
///
/// γ_ik = w_k N(y_i | μ_k, Σ_k) / Σ_j w_j N(y_i | μ_j, Σ_j)
///
/// If no component assigns positive density to an observation, its row cannot be
/// normalized and ZeroResponsibility is returned.
pub fn expectation_step(y : &DMatrix<f64>, params : &MixtureParams) -> Result<DMatrix<f64>> {
    let components = params.components()?;
    responsibilities(y, &components[..], params.weights())
}

pub(crate) fn responsibilities(
    y : &DMatrix<f64>,
    components : &[Gaussian],
    weights : &DVector<f64>
) -> Result<DMatrix<f64>> {
    let (n, k) = (y.nrows(), components.len());
    let mut resp = DMatrix::zeros(n, k);
    for (i, row) in y.row_iter().enumerate() {
        let x = row.transpose();
        for (c, (g, w)) in components.iter().zip(weights.iter()).enumerate() {
            resp[(i, c)] = w * g.prob(&x);
        }

        // Marginal density of the ith observation over all classes.
        let marg = resp.row(i).sum();
        if !(marg > 0.0) || !marg.is_finite() {
            return Err(MixtureError::ZeroResponsibility { row : i });
        }
        resp.row_mut(i).unscale_mut(marg);
    }
    Ok(resp)
}

/// Re-estimates the parameters from the responsibilities. All means are updated
/// before any covariance, since covariances are taken around the new means:
///
/// N_k = Σ_i γ_ik
/// μ_k = Σ_i γ_ik y_i / N_k
/// Σ_k = Σ_i γ_ik (y_i - μ_k)(y_i - μ_k)^T / N_k
/// w_k = N_k / n
pub fn maximization_step(y : &DMatrix<f64>, resp : &DMatrix<f64>) -> Result<MixtureParams> {
    let (n, p) = y.shape();
    let k = resp.ncols();
    if resp.nrows() != n {
        return Err(MixtureError::DimensionMismatch { expected : n, found : resp.nrows() });
    }

    // Marginal responsibilities (over observations), one for each class
    let marg_resp_obs = DVector::from_iterator(k, resp.column_iter().map(|col| col.sum() ));
    if let Some(c) = marg_resp_obs.iter().position(|n_k| !(*n_k > 0.0) ) {
        return Err(MixtureError::EmptyComponent { component : c });
    }

    let mut means = Vec::with_capacity(k);
    for c in 0..k {
        let mut mu = DVector::zeros(p);
        for (i, row) in y.row_iter().enumerate() {
            mu.axpy(resp[(i, c)], &row.transpose(), 1.0);
        }
        mu.unscale_mut(marg_resp_obs[c]);
        means.push(mu);
    }

    let mut covariances = Vec::with_capacity(k);
    for (c, mu) in means.iter().enumerate() {
        let mut sigma = DMatrix::zeros(p, p);
        for (i, row) in y.row_iter().enumerate() {
            let err = row.transpose() - mu;
            sigma.ger(resp[(i, c)], &err, &err, 1.0);
        }
        sigma.unscale_mut(marg_resp_obs[c]);
        covariances.push(sigma);
    }

    let weights = marg_resp_obs.unscale(n as f64);
    MixtureParams::new(means, covariances, weights)
}
