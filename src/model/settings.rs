use serde::{Serialize, Deserialize};
use std::str::FromStr;
use crate::error::{MixtureError, Result};
use crate::fit::InitPolicy;

fn default_max_iter() -> usize {
    100
}

fn default_tol() -> f64 {
    1E-4
}

fn default_seed() -> u64 {
    42
}

/// Configuration of a Gaussian mixture fit. Can be built in code or read from a
/// JSON object, where every field but n_cluster is optional:
///
/// ```json
/// { "n_cluster" : 3, "init" : "random", "max_iter" : 200, "tol" : 1e-6, "seed" : 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureSettings {

    /// Number of mixture components (k).
    pub n_cluster : usize,

    #[serde(default)]
    pub init : InitPolicy,

    /// Maximum number of EM updates (also bounds the k-means initializer).
    #[serde(default = "default_max_iter")]
    pub max_iter : usize,

    /// Absolute log-likelihood change below which iteration stops.
    #[serde(default = "default_tol")]
    pub tol : f64,

    /// Seed of the random generator used by fit(.) and sample(.).
    #[serde(default = "default_seed")]
    pub seed : u64

}

impl MixtureSettings {

    pub fn new(n_cluster : usize) -> Self {
        Self {
            n_cluster,
            init : InitPolicy::default(),
            max_iter : default_max_iter(),
            tol : default_tol(),
            seed : default_seed()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_cluster == 0 {
            return Err(MixtureError::invalid("n_cluster", "at least one component is required"));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(MixtureError::invalid("tol", format!("tolerance should be finite and non-negative (got {})", self.tol)));
        }
        Ok(())
    }

    /// Parses and validates settings from a JSON object. An unrecognized "init"
    /// string is reported as UnknownInit.
    pub fn from_json(src : &str) -> Result<Self> {
        let value : serde_json::Value = serde_json::from_str(src)?;
        if let Some(init) = value.get("init").and_then(|v| v.as_str() ) {
            init.parse::<InitPolicy>()?;
        }
        let settings : Self = serde_json::from_value(value)?;
        settings.validate()?;
        Ok(settings)
    }

}

impl FromStr for MixtureSettings {

    type Err = MixtureError;

    fn from_str(s : &str) -> Result<Self> {
        Self::from_json(s)
    }

}
