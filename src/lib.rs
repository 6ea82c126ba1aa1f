//! Gaussian mixture models fitted by expectation-maximization.
//!
//! A mixture of k multivariate normals is fitted to the rows of a data matrix (n x d).
//! Parameters start from either a random guess or a k-means partition, and are refined
//! by alternating E-steps (posterior component probabilities of each observation) and
//! M-steps (weighted re-estimation of means, covariances and weights) until the data
//! log-likelihood stabilizes. Fitted models can generate new observations and evaluate
//! the likelihood of other data sets.

/// Error type shared by all modules.
pub mod error;

/// Multivariate normal densities and mixture parameter triples.
pub mod prob;

/// Initialization, expectation-maximization and log-likelihood evaluation.
pub mod fit;

/// Helpers to build and check data matrices.
pub mod sample;

/// The user-facing mixture model and its configuration.
pub mod model;

pub use error::{MixtureError, Result};

pub use prob::{Gaussian, MixtureParams};

pub use fit::{EmStatus, ExpectMax, InitPolicy, log_likelihood};

pub use fit::cluster::{Clustering, ClusterError, KMeans, Partition};

pub use model::{GaussianMixture, MixtureSettings, Overrides};

pub use sample::matrix_from_rows;
