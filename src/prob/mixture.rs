use nalgebra::*;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Serialize, Deserialize};
use std::fmt::{self, Display};
use std::convert::TryFrom;
use super::gaussian::Gaussian;
use crate::error::{MixtureError, Result};

/// Tolerance on |Σ w_k - 1| accepted when validating mixture weights.
const WEIGHT_TOL : f64 = 1E-6;

/// A mixture is a linear combination of k multivariate normal densities, weighted
/// by the probabilities of a categorical draw:
///
/// p(y) = Σ_k w_k N(y | μ_k, Σ_k)
///
/// MixtureParams holds the raw (μ, Σ, w) triple. The derived Gaussian components
/// are rebuilt from it every time they are needed, since any update to the means or
/// covariances makes the cached precision matrices stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMixtureParams")]
pub struct MixtureParams {

    /// One mean vector (px1) per component.
    means : Vec<DVector<f64>>,

    /// One covariance matrix (pxp) per component.
    covariances : Vec<DMatrix<f64>>,

    /// Categorical probabilities of component allocation.
    weights : DVector<f64>

}

/// Unchecked deserialization target. Every deserialized MixtureParams passes through
/// MixtureParams::new, so it satisfies the same invariants as one built in code.
#[derive(Deserialize)]
struct RawMixtureParams {
    means : Vec<DVector<f64>>,
    covariances : Vec<DMatrix<f64>>,
    weights : DVector<f64>
}

impl TryFrom<RawMixtureParams> for MixtureParams {

    type Error = MixtureError;

    fn try_from(raw : RawMixtureParams) -> Result<Self> {
        MixtureParams::new(raw.means, raw.covariances, raw.weights)
    }

}

impl MixtureParams {

    /// Builds a parameter triple, verifying that all means share the same dimension,
    /// that covariances are pxp, and that weights are non-negative and sum to one.
    pub fn new(
        means : Vec<DVector<f64>>,
        covariances : Vec<DMatrix<f64>>,
        weights : DVector<f64>
    ) -> Result<Self> {
        let params = Self { means, covariances, weights };
        params.validate()?;
        Ok(params)
    }

    /// Re-checks the invariants of new(.); Used after deserialization.
    pub fn validate(&self) -> Result<()> {
        let k = self.means.len();
        if k == 0 {
            return Err(MixtureError::EmptyInput);
        }
        let p = self.means[0].nrows();
        if p == 0 {
            return Err(MixtureError::EmptyInput);
        }
        for mu in self.means.iter() {
            if mu.nrows() != p {
                return Err(MixtureError::DimensionMismatch { expected : p, found : mu.nrows() });
            }
        }
        if self.covariances.len() != k {
            return Err(MixtureError::DimensionMismatch { expected : k, found : self.covariances.len() });
        }
        for sigma in self.covariances.iter() {
            if sigma.nrows() != p || sigma.ncols() != p {
                let found = if sigma.nrows() != p { sigma.nrows() } else { sigma.ncols() };
                return Err(MixtureError::DimensionMismatch { expected : p, found });
            }
        }
        if self.weights.nrows() != k {
            return Err(MixtureError::DimensionMismatch { expected : k, found : self.weights.nrows() });
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0 ) {
            return Err(MixtureError::invalid("weights", "weights must be finite and non-negative"));
        }
        if (self.weights.sum() - 1.0).abs() > WEIGHT_TOL {
            return Err(MixtureError::invalid("weights", format!("weights sum to {}", self.weights.sum())));
        }
        Ok(())
    }

    /// Number of mixture components (k).
    pub fn n_components(&self) -> usize {
        self.means.len()
    }

    /// Dimensionality of the observations (p).
    pub fn dim(&self) -> usize {
        self.means[0].nrows()
    }

    pub fn means(&self) -> &[DVector<f64>] {
        &self.means[..]
    }

    pub fn covariances(&self) -> &[DMatrix<f64>] {
        &self.covariances[..]
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Returns the k means arranged over the rows of a kxp matrix.
    pub fn mean_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.n_components(), self.dim(), |k, j| self.means[k][j] )
    }

    /// Builds one Gaussian per component from the current means and covariances.
    pub fn components(&self) -> Result<Vec<Gaussian>> {
        self.means.iter()
            .zip(self.covariances.iter())
            .enumerate()
            .map(|(k, (mu, sigma))| Gaussian::for_component(k, mu.clone(), sigma.clone()) )
            .collect()
    }

    /// Draws count observations from the mixture, arranged over the rows of a
    /// (count x p) matrix. All component indices are drawn first (from the categorical
    /// distribution defined by the weights); then one vector is drawn from the
    /// selected component for each row.
    pub fn sample<R : Rng>(&self, count : usize, rng : &mut R) -> Result<DMatrix<f64>> {
        if count == 0 {
            return Err(MixtureError::invalid("count", "sample count should be a positive integer"));
        }
        let components = self.components()?;
        let cat = WeightedIndex::new(self.weights.iter())
            .map_err(|e| MixtureError::invalid("weights", e.to_string()) )?;
        let allocs : Vec<usize> = (0..count).map(|_| cat.sample(rng) ).collect();
        let mut dst = DMatrix::zeros(count, self.dim());
        for (i, k) in allocs.iter().enumerate() {
            let draw = components[*k].sample(rng);
            dst.row_mut(i).copy_from(&draw.transpose());
        }
        Ok(dst)
    }

}

impl Display for MixtureParams {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        for k in 0..self.n_components() {
            writeln!(f, "Component {}: Weight = {:.4}; Mean = {}", k, self.weights[k], self.means[k].transpose())?;
        }
        Ok(())
    }

}
