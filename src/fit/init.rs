use nalgebra::*;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use std::convert::TryFrom;
use crate::error::{MixtureError, Result};
use crate::prob::MixtureParams;
use crate::sample;
use super::cluster::{Clustering, KMeans, Partition};

/// How the mixture parameters are chosen before the first EM iteration.
/// Serialized as "random" or "k_means"; deserialized through FromStr, so the
/// aliases accepted on the command line are also accepted in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum InitPolicy {

    /// Means drawn uniformly over the data range; identity covariances; uniform weights.
    Random,

    /// Means, covariances and weights from a hard k-means partition.
    KMeans

}

impl Default for InitPolicy {

    fn default() -> Self {
        InitPolicy::KMeans
    }

}

impl FromStr for InitPolicy {

    type Err = MixtureError;

    fn from_str(s : &str) -> Result<Self> {
        match s {
            "random" => Ok(InitPolicy::Random),
            "k_means" | "k-means" | "kmeans" => Ok(InitPolicy::KMeans),
            other => Err(MixtureError::UnknownInit(other.to_string()))
        }
    }

}

impl TryFrom<String> for InitPolicy {

    type Error = MixtureError;

    fn try_from(s : String) -> Result<Self> {
        s.parse()
    }

}

impl fmt::Display for InitPolicy {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        match self {
            InitPolicy::Random => write!(f, "random"),
            InitPolicy::KMeans => write!(f, "k_means")
        }
    }

}

/// Produces the initial parameter triple for k components under the informed policy.
/// k-means runs for at most max_iter iterations.
pub fn initialize(
    y : &DMatrix<f64>,
    k : usize,
    policy : InitPolicy,
    max_iter : usize,
    rng : &mut StdRng
) -> Result<MixtureParams> {
    sample::check_data(y)?;
    if k == 0 {
        return Err(MixtureError::invalid("n_cluster", "at least one component is required"));
    }
    match policy {
        InitPolicy::Random => random_params(y, k, rng),
        InitPolicy::KMeans => {
            let km = KMeans::new(k).with_max_iter(max_iter.max(1));
            clustered_params(y, &km, rng)
        }
    }
}

/// Runs any clustering collaborator and converts its partition into mixture parameters.
pub fn clustered_params<C>(y : &DMatrix<f64>, clustering : &C, rng : &mut StdRng) -> Result<MixtureParams>
where
    C : Clustering + ?Sized
{
    let partition = clustering.cluster(y, rng)?;
    tracing::debug!(iterations = partition.iterations(), "k-means initialization finished");
    from_partition(y, &partition)
}

/// Converts hard allocations into one-hot responsibilities, and computes for each
/// cluster the weighted covariance of residuals around the cluster center:
///
/// Σ_k = Σ_i γ_ik (x_i - μ_k)(x_i - μ_k)^T / N_k,   w_k = N_k / N
///
/// A cluster without observations cannot define a covariance, and is reported
/// as EmptyComponent.
pub fn from_partition(y : &DMatrix<f64>, partition : &Partition) -> Result<MixtureParams> {
    let (n, p) = y.shape();
    let k = partition.n_cluster();
    if partition.allocations().len() != n {
        return Err(MixtureError::DimensionMismatch { expected : n, found : partition.allocations().len() });
    }
    if let Some(bad) = partition.means().iter().find(|m| m.nrows() != p ) {
        return Err(MixtureError::DimensionMismatch { expected : p, found : bad.nrows() });
    }
    if let Some(bad) = partition.allocations().iter().find(|a| **a >= k ) {
        return Err(MixtureError::invalid("allocations", format!("cluster index {} out of bounds", bad)));
    }

    let mut resp = DMatrix::<f64>::zeros(n, k);
    for (i, alloc) in partition.allocations().iter().enumerate() {
        resp[(i, *alloc)] = 1.0;
    }

    let mut covariances = Vec::with_capacity(k);
    let mut weights = DVector::zeros(k);
    for c in 0..k {
        let n_k = resp.column(c).sum();
        if n_k == 0.0 {
            return Err(MixtureError::EmptyComponent { component : c });
        }
        let mu = &partition.means()[c];
        let mut sigma = DMatrix::zeros(p, p);
        for (i, row) in y.row_iter().enumerate() {
            let err = row.transpose() - mu;
            sigma.ger(resp[(i, c)], &err, &err, 1.0);
        }
        sigma.unscale_mut(n_k);
        covariances.push(sigma);
        weights[c] = n_k / n as f64;
    }
    MixtureParams::new(partition.means().to_vec(), covariances, weights)
}

/// Draws each mean coordinate uniformly within the observed range of that column.
pub fn random_params(y : &DMatrix<f64>, k : usize, rng : &mut StdRng) -> Result<MixtureParams> {
    let p = y.ncols();
    let bounds = sample::column_bounds(y);
    let means : Vec<DVector<f64>> = (0..k)
        .map(|_| {
            DVector::from_iterator(p, bounds.iter().map(|(lo, hi)| lo + rng.gen::<f64>() * (hi - lo) ))
        })
        .collect();
    let covariances = (0..k).map(|_| DMatrix::identity(p, p) ).collect();
    let weights = DVector::from_element(k, 1. / k as f64);
    MixtureParams::new(means, covariances, weights)
}
