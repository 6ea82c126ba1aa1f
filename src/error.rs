use thiserror::Error;
use crate::fit::cluster::ClusterError;

/// Errors returned while configuring, fitting or sampling a mixture.
#[derive(Debug, Clone, Error)]
pub enum MixtureError {

    /// Dataset (or row set) has no observations or no columns.
    #[error("empty input")]
    EmptyInput,

    /// Rows, means or covariances disagree about the dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        expected : usize,
        found : usize
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        name : &'static str,
        message : String
    },

    /// Initialization policy string did not match any known policy.
    #[error("unknown initialization policy '{0}' (expected 'random' or 'k_means')")]
    UnknownInit(String),

    /// Parameters were requested from a model that was never fitted.
    #[error("model not fitted: call fit before sampling or evaluating")]
    NotFitted,

    /// Covariance could not be factored even after regularization.
    #[error("covariance matrix of component {component} is singular")]
    SingularCovariance {
        component : usize
    },

    /// Every component assigned zero density to an observation.
    #[error("zero responsibility mass at observation {row}")]
    ZeroResponsibility {
        row : usize
    },

    /// A component received no responsibility mass.
    #[error("component {component} has no responsibility mass")]
    EmptyComponent {
        component : usize
    },

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("serialization error: {0}")]
    Serde(String)

}

impl MixtureError {

    /// True for the arithmetic failures of the EM iteration (singular
    /// covariances, zero responsibility mass, empty components).
    pub fn is_degenerate(&self) -> bool {
        match self {
            MixtureError::SingularCovariance { .. } |
            MixtureError::ZeroResponsibility { .. } |
            MixtureError::EmptyComponent { .. } => true,
            _ => false
        }
    }

    pub(crate) fn invalid(name : &'static str, message : impl Into<String>) -> Self {
        MixtureError::InvalidParameter { name, message : message.into() }
    }

}

impl From<serde_json::Error> for MixtureError {

    fn from(e : serde_json::Error) -> Self {
        MixtureError::Serde(e.to_string())
    }

}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, MixtureError>;
