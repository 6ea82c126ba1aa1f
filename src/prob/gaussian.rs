use nalgebra::*;
use nalgebra::storage::Storage;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;
use std::fmt::{self, Display};
use crate::error::{MixtureError, Result};

/// Magnitude of the diagonal added to a rank-deficient covariance.
pub const REGULARIZATION : f64 = 1e-3;

/// Multivariate normal parametrized by μ (px1) and Σ (pxp), with the
/// precision matrix and normalization constant computed once at construction.
/// A Gaussian is rebuilt (never updated) whenever its mean or covariance change.
#[derive(Debug, Clone)]
pub struct Gaussian {

    mu : DVector<f64>,

    /// Covariance actually used for evaluation (regularized if it was rank-deficient).
    sigma : DMatrix<f64>,

    sigma_inv : DMatrix<f64>,

    /// Lower Cholesky factor of sigma (matrix square root used for sampling).
    sigma_low : DMatrix<f64>,

    /// (2π)^p |Σ|
    norm_const : f64,

    regularized : bool

}

impl Gaussian {

    /// Builds a component from a mean vector and covariance matrix. If the covariance
    /// has numerical rank smaller than p, REGULARIZATION * I is added before the
    /// Cholesky decomposition. A covariance that still cannot be factored is reported
    /// as SingularCovariance (the component index is informed by the caller via
    /// Self::for_component).
    pub fn new(mu : DVector<f64>, sigma : DMatrix<f64>) -> Result<Self> {
        Self::for_component(0, mu, sigma)
    }

    pub(crate) fn for_component(k : usize, mu : DVector<f64>, mut sigma : DMatrix<f64>) -> Result<Self> {
        let p = mu.nrows();
        if p == 0 {
            return Err(MixtureError::EmptyInput);
        }
        if sigma.nrows() != p {
            return Err(MixtureError::DimensionMismatch { expected : p, found : sigma.nrows() });
        }
        if sigma.ncols() != p {
            return Err(MixtureError::DimensionMismatch { expected : p, found : sigma.ncols() });
        }
        if sigma.iter().chain(mu.iter()).any(|v| !v.is_finite() ) {
            return Err(MixtureError::SingularCovariance { component : k });
        }

        let regularized = numerical_rank(&sigma) < p;
        if regularized {
            tracing::debug!(component = k, "covariance is rank-deficient; adding {} * I", REGULARIZATION);
            for i in 0..p {
                sigma[(i, i)] += REGULARIZATION;
            }
        }

        let chol = Cholesky::new(sigma.clone())
            .ok_or(MixtureError::SingularCovariance { component : k })?;
        let sigma_low = chol.l();
        let det = sigma_low.diagonal().iter().map(|d| d * d ).product::<f64>();
        let norm_const = (2. * PI).powi(p as i32) * det;
        if !(norm_const > 0.0) || !norm_const.is_finite() {
            return Err(MixtureError::SingularCovariance { component : k });
        }
        let sigma_inv = chol.inverse();

        Ok(Self { mu, sigma, sigma_inv, sigma_low, norm_const, regularized })
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mu
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        &self.sigma
    }

    pub fn cov_inv(&self) -> &DMatrix<f64> {
        &self.sigma_inv
    }

    pub fn dim(&self) -> usize {
        self.mu.nrows()
    }

    /// Whether the informed covariance needed the diagonal regularization.
    pub fn regularized(&self) -> bool {
        self.regularized
    }

    /// (2π)^p |Σ|; the density is divided by its square root.
    pub fn norm_const(&self) -> f64 {
        self.norm_const
    }

    /// Squared Mahalanobis distance (x-μ)^T Σ^-1 (x-μ).
    pub fn mahalanobis<S>(&self, x : &Matrix<f64, Dynamic, U1, S>) -> f64
    where
        S : Storage<f64, Dynamic, U1>
    {
        let err = x - &self.mu;
        err.dot(&(&self.sigma_inv * &err))
    }

    /// Density of the observation x: exp(-0.5 (x-μ)^T Σ^-1 (x-μ)) / sqrt((2π)^p |Σ|)
    ///
    /// # Panics
    ///
    /// If x does not have self.dim() rows. Mixture-level callers (log_likelihood,
    /// expectation_step) check the data dimension and return DimensionMismatch instead.
    pub fn prob<S>(&self, x : &Matrix<f64, Dynamic, U1, S>) -> f64
    where
        S : Storage<f64, Dynamic, U1>
    {
        assert!(x.nrows() == self.dim(), "prob: observation has wrong dimension");
        (-0.5 * self.mahalanobis(x)).exp() / self.norm_const.sqrt()
    }

    /// Draws a single realization as μ + L z, where L is the lower Cholesky
    /// factor of the covariance and z a vector of independent standard normal draws.
    pub fn sample<R : Rng>(&self, rng : &mut R) -> DVector<f64> {
        let z = DVector::from_fn(self.dim(), |_, _| rng.sample::<f64, _>(StandardNormal) );
        &self.sigma_low * z + &self.mu
    }

}

impl Display for Gaussian {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gaussian(mean = {}, cov = {})", self.mu.transpose(), self.sigma)
    }

}

/// Number of singular values of m above max(S) * p * machine epsilon.
pub fn numerical_rank(m : &DMatrix<f64>) -> usize {
    let svd = SVD::new(m.clone(), false, false);
    let s = &svd.singular_values;
    let s_max = s.iter().cloned().fold(0.0, f64::max);
    let tol = s_max * (m.nrows().max(m.ncols()) as f64) * f64::EPSILON;
    s.iter().filter(|v| **v > tol ).count()
}
