/// Hard clustering collaborators (k-means), used to initialize mixtures.
pub mod cluster;

/// Initialization policies for the mixture parameters.
pub mod init;

/// Expectation-maximization for Gaussian mixtures.
pub mod em;

/// Data log-likelihood under a parameter triple.
pub mod likelihood;

pub use em::*;

pub use init::*;

pub use likelihood::log_likelihood;
