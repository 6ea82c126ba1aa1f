/// Multivariate normal component with cached precision and normalization constant.
mod gaussian;

pub use gaussian::*;

/// Mixture parameter triple (means, covariances, weights) and the mixture sampler.
mod mixture;

pub use mixture::*;
