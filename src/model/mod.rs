use nalgebra::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::fmt::{self, Display};
use std::path::Path;
use crate::error::{MixtureError, Result};
use crate::fit::{self, EmStatus, ExpectMax, InitPolicy};
use crate::fit::em::responsibilities;
use crate::prob::MixtureParams;
use crate::sample;

mod settings;

pub use settings::*;

/// Optional replacements for the fitted parameters, used by
/// GaussianMixture::log_likelihood_with. Missing entries default to
/// the parameters of the fitted model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    pub means : Option<&'a [DVector<f64>]>,
    pub covariances : Option<&'a [DMatrix<f64>]>,
    pub weights : Option<&'a DVector<f64>>
}

/// Gaussian mixture model fitted by expectation-maximization.
///
/// ```
/// use gaussmix::GaussianMixture;
/// use nalgebra::DMatrix;
///
/// let data = DMatrix::from_row_slice(6, 2, &[
///     0.0, 0.0, 0.4, 0.1, 0.1, 0.5,
///     9.0, 9.0, 9.4, 9.1, 9.1, 9.5
/// ]);
/// let mut gmm = GaussianMixture::new(2).with_seed(42);
/// let iterations = gmm.fit(&data).unwrap();
/// assert!(iterations <= 100);
/// let weights = gmm.params().unwrap().weights();
/// assert!((weights.sum() - 1.0).abs() < 1E-9);
/// let draws = gmm.sample(10).unwrap();
/// assert_eq!(draws.shape(), (10, 2));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianMixture {

    settings : MixtureSettings,

    /// Parameters after the last successful call to fit(.). None if the model was never fitted.
    params : Option<MixtureParams>,

    status : Option<EmStatus>,

    /// Log-likelihood of the initial parameters and after each EM iteration of the last fit.
    trace : Vec<f64>

}

impl GaussianMixture {

    /// Creates an unfitted model with n_cluster components and default settings.
    pub fn new(n_cluster : usize) -> Self {
        Self::unfitted(MixtureSettings::new(n_cluster))
    }

    pub fn from_settings(settings : MixtureSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::unfitted(settings))
    }

    fn unfitted(settings : MixtureSettings) -> Self {
        Self { settings, params : None, status : None, trace : Vec::new() }
    }

    pub fn with_init(mut self, init : InitPolicy) -> Self {
        self.settings.init = init;
        self
    }

    pub fn with_max_iter(mut self, max_iter : usize) -> Self {
        self.settings.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol : f64) -> Self {
        self.settings.tol = tol;
        self
    }

    pub fn with_seed(mut self, seed : u64) -> Self {
        self.settings.seed = seed;
        self
    }

    pub fn settings(&self) -> &MixtureSettings {
        &self.settings
    }

    pub fn n_cluster(&self) -> usize {
        self.settings.n_cluster
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Option<&MixtureParams> {
        self.params.as_ref()
    }

    /// Final state of the EM iteration of the last fit (None if never fitted).
    pub fn status(&self) -> Option<EmStatus> {
        self.status
    }

    pub fn trace(&self) -> &[f64] {
        &self.trace[..]
    }

    fn fitted(&self) -> Result<&MixtureParams> {
        self.params.as_ref().ok_or(MixtureError::NotFitted)
    }

    /// Fits the mixture to the rows of y, using a generator seeded with settings.seed.
    /// Returns the EM iteration index at which convergence was detected, or
    /// settings.max_iter when the iteration budget was exhausted.
    pub fn fit(&mut self, y : &DMatrix<f64>) -> Result<usize> {
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        self.fit_with_rng(y, &mut rng)
    }

    /// Fits the mixture drawing initialization randomness from rng. On failure the
    /// model keeps the parameters of its previous fit (if any).
    pub fn fit_with_rng(&mut self, y : &DMatrix<f64>, rng : &mut StdRng) -> Result<usize> {
        self.settings.validate()?;
        sample::check_data(y)?;
        if self.settings.n_cluster > y.nrows() {
            return Err(MixtureError::invalid(
                "n_cluster",
                format!("{} components requested for {} observations", self.settings.n_cluster, y.nrows())
            ));
        }
        let init = fit::initialize(y, self.settings.n_cluster, self.settings.init, self.settings.max_iter, rng)?;
        self.fit_from(y, init)
    }

    /// Runs EM from an explicit initial parameter triple, bypassing the initialization policy.
    pub fn fit_from(&mut self, y : &DMatrix<f64>, init : MixtureParams) -> Result<usize> {
        self.settings.validate()?;
        sample::check_data(y)?;
        if init.n_components() != self.settings.n_cluster {
            return Err(MixtureError::DimensionMismatch {
                expected : self.settings.n_cluster,
                found : init.n_components()
            });
        }
        let mut em = ExpectMax::new(y, init)?;
        let n_iter = em.run(self.settings.max_iter, self.settings.tol)?;
        let (params, status, trace) = em.finish();
        self.params = Some(params);
        self.status = Some(status);
        self.trace = trace;
        Ok(n_iter)
    }

    /// Draws count observations from the fitted mixture, using a generator
    /// seeded with settings.seed.
    pub fn sample(&self, count : usize) -> Result<DMatrix<f64>> {
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        self.sample_with_rng(count, &mut rng)
    }

    pub fn sample_with_rng(&self, count : usize, rng : &mut StdRng) -> Result<DMatrix<f64>> {
        if count == 0 {
            return Err(MixtureError::invalid("count", "sample count should be a positive integer"));
        }
        self.fitted()?.sample(count, rng)
    }

    /// Log-likelihood of the rows of y under the fitted parameters.
    pub fn log_likelihood(&self, y : &DMatrix<f64>) -> Result<f64> {
        self.log_likelihood_with(y, Overrides::default())
    }

    /// Log-likelihood of the rows of y, where any of means, covariances or weights
    /// can be replaced by the informed values. If all three are informed, the model
    /// does not need to be fitted.
    pub fn log_likelihood_with(&self, y : &DMatrix<f64>, over : Overrides<'_>) -> Result<f64> {
        sample::check_data(y)?;
        let params = match (over.means, over.covariances, over.weights) {
            (Some(means), Some(covs), Some(weights)) => {
                MixtureParams::new(means.to_vec(), covs.to_vec(), weights.clone())?
            },
            (means, covs, weights) => {
                let fitted = self.fitted()?;
                MixtureParams::new(
                    means.unwrap_or(fitted.means()).to_vec(),
                    covs.unwrap_or(fitted.covariances()).to_vec(),
                    weights.unwrap_or(fitted.weights()).clone()
                )?
            }
        };
        fit::log_likelihood(y, &params)
    }

    /// Posterior probability of each component for each row of y (n x k).
    pub fn responsibilities(&self, y : &DMatrix<f64>) -> Result<DMatrix<f64>> {
        sample::check_data(y)?;
        let params = self.fitted()?;
        if y.ncols() != params.dim() {
            return Err(MixtureError::DimensionMismatch { expected : params.dim(), found : y.ncols() });
        }
        let components = params.components()?;
        responsibilities(y, &components[..], params.weights())
    }

    /// Most likely component of each row of y.
    pub fn predict(&self, y : &DMatrix<f64>) -> Result<Vec<usize>> {
        let resp = self.responsibilities(y)?;
        Ok(resp.row_iter().map(|row| row.transpose().imax() ).collect())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(src : &str) -> Result<Self> {
        let model : Self = serde_json::from_str(src)?;
        model.settings.validate()?;
        Ok(model)
    }

    pub fn load<R>(mut reader : R) -> Result<Self>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)
            .map_err(|e| MixtureError::Serde(e.to_string()) )?;
        Self::from_json(&content[..])
    }

    pub fn load_from_path<P>(path : P) -> Result<Self>
    where
        P : AsRef<Path>
    {
        let f = File::open(path).map_err(|e| MixtureError::Serde(e.to_string()) )?;
        Self::load(f)
    }

    pub fn save<W>(&self, mut writer : W) -> Result<()>
    where
        W : Write
    {
        let content = self.to_json()?;
        writer.write_all(content.as_bytes()).map_err(|e| MixtureError::Serde(e.to_string()) )
    }

    pub fn save_to_path<P>(&self, path : P) -> Result<()>
    where
        P : AsRef<Path>
    {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)
            .map_err(|e| MixtureError::Serde(e.to_string()) )?;
        self.save(file)
    }

}

impl Display for GaussianMixture {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GaussianMixture (k = {}, init = {})", self.settings.n_cluster, self.settings.init)?;
        match &self.params {
            Some(params) => write!(f, "{}", params),
            None => writeln!(f, "(not fitted)")
        }
    }

}
