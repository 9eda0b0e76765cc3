//! Gaussian process regression with Bayesian hyperparameter treatment
//!
//! A [`GaussianProcess`] owns its training data and a set of posterior
//! hyperparameter draws. `fit` delegates hyperparameter inference to a
//! [`PosteriorSampler`]; `predict` conditions on the data once per stored
//! draw and pools the resulting predictive distributions.

use std::fmt;

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, Dyn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::HALF_LN_2PI;
use crate::dist::{Gaussian, MvGaussian};
use crate::kernel::{Kernel, KernelError, KernelParams, JITTER};
use crate::process::Surrogate;
use crate::sampler::{PosteriorSampler, SamplerError, SamplerOptions};
use crate::traits::{HasDensity, Sampleable};
use crate::Error;

/// Mean function over input points, evaluated identically on training and
/// test inputs.
pub type MeanFn = dyn Fn(&DMatrix<f64>) -> DVector<f64> + Send + Sync;

/// One joint posterior draw of the kernel hyperparameters and the
/// observation noise variance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct HyperparameterSample {
    length_scale: DVector<f64>,
    signal_variance: f64,
    noise: f64,
}

impl HyperparameterSample {
    /// Create a new sample, checking positivity of every component.
    pub fn new(
        length_scale: DVector<f64>,
        signal_variance: f64,
        noise: f64,
    ) -> Result<Self, KernelError> {
        // reuse the kernel-side validation for the shared parameters
        let _ = KernelParams::new(length_scale.clone(), signal_variance)?;
        if noise < 0.0 || !noise.is_finite() {
            return Err(KernelError::ParameterOutOfBounds {
                name: "noise",
                given: noise,
                bounds: (0.0, f64::INFINITY),
            });
        }
        Ok(Self {
            length_scale,
            signal_variance,
            noise,
        })
    }

    /// Map a point in unconstrained (log) coordinates back to the positive
    /// hyperparameter space.
    ///
    /// Layout: `input_dim` length-scales, then the signal variance, then the
    /// observation noise.
    pub fn from_unconstrained(
        t: &[f64],
        input_dim: usize,
    ) -> Result<Self, Error> {
        if t.len() != input_dim + 2 {
            return Err(Error::ShapeMismatch {
                expected: input_dim + 2,
                got: t.len(),
            });
        }
        let length_scale = DVector::from_iterator(
            input_dim,
            t[..input_dim].iter().map(|v| v.exp()),
        );
        Ok(Self {
            length_scale,
            signal_variance: t[input_dim].exp(),
            noise: t[input_dim + 1].exp(),
        })
    }

    /// Per-dimension length-scales
    #[must_use]
    pub fn length_scale(&self) -> &DVector<f64> {
        &self.length_scale
    }

    /// Signal variance
    #[must_use]
    pub fn signal_variance(&self) -> f64 {
        self.signal_variance
    }

    /// Observation noise variance
    #[must_use]
    pub fn noise(&self) -> f64 {
        self.noise
    }

    /// The kernel-side view of this sample.
    pub fn kernel_params(&self) -> Result<KernelParams, KernelError> {
        KernelParams::new(self.length_scale.clone(), self.signal_variance)
    }
}

/// Posterior-predictive summary returned by `predict`.
///
/// `draws` is the empirical approximation to the marginal posterior
/// predictive: one row per draw, one column per candidate point.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Prediction {
    mean: DVector<f64>,
    draws: DMatrix<f64>,
}

impl Prediction {
    /// Assemble a prediction from a mean vector and a draw matrix with one
    /// column per candidate.
    pub fn new(
        mean: DVector<f64>,
        draws: DMatrix<f64>,
    ) -> Result<Self, Error> {
        if mean.len() != draws.ncols() {
            return Err(Error::ShapeMismatch {
                expected: mean.len(),
                got: draws.ncols(),
            });
        }
        Ok(Self { mean, draws })
    }

    /// Predictive mean, averaged over hyperparameter samples.
    #[must_use]
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// All posterior draws, one row per draw.
    #[must_use]
    pub fn draws(&self) -> &DMatrix<f64> {
        &self.draws
    }

    /// Number of candidate points
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.draws.ncols()
    }

    /// Number of retained draws
    #[must_use]
    pub fn n_draws(&self) -> usize {
        self.draws.nrows()
    }

    /// Per-candidate mean of the draws.
    #[must_use]
    pub fn draw_mean(&self) -> DVector<f64> {
        let n = self.draws.nrows() as f64;
        DVector::from_fn(self.draws.ncols(), |j, _| {
            self.draws.column(j).sum() / n
        })
    }

    /// Per-candidate (population) variance of the draws.
    #[must_use]
    pub fn draw_variance(&self) -> DVector<f64> {
        let n = self.draws.nrows() as f64;
        let means = self.draw_mean();
        DVector::from_fn(self.draws.ncols(), |j, _| {
            self.draws
                .column(j)
                .iter()
                .map(|v| (v - means[j]).powi(2))
                .sum::<f64>()
                / n
        })
    }

    /// Per-candidate standard deviation of the draws.
    #[must_use]
    pub fn draw_std(&self) -> DVector<f64> {
        self.draw_variance().map(f64::sqrt)
    }

    /// Best value observed across all draws and candidates.
    #[must_use]
    pub fn best(&self) -> f64 {
        self.draws
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Gaussian process surrogate model.
///
/// Constructed once with a kernel, an input dimension, and optionally a mean
/// function; fit at most once per dataset (repeated fits overwrite); queried
/// arbitrarily often. `predict` is read-only, so concurrent predictions from
/// many threads are safe.
pub struct GaussianProcess<K: Kernel> {
    input_dim: usize,
    kernel: K,
    mean_fn: Option<Box<MeanFn>>,
    x_train: Option<DMatrix<f64>>,
    y_train: Option<DVector<f64>>,
    samples: Vec<HyperparameterSample>,
}

impl<K: Kernel> GaussianProcess<K> {
    /// Create an unfitted model over `input_dim`-dimensional inputs.
    #[must_use]
    pub fn new(kernel: K, input_dim: usize) -> Self {
        Self {
            input_dim,
            kernel,
            mean_fn: None,
            x_train: None,
            y_train: None,
            samples: Vec::new(),
        }
    }

    /// Attach a prior mean function.
    #[must_use]
    pub fn with_mean_fn<F>(mut self, mean_fn: F) -> Self
    where
        F: Fn(&DMatrix<f64>) -> DVector<f64> + Send + Sync + 'static,
    {
        self.mean_fn = Some(Box::new(mean_fn));
        self
    }

    /// Input dimension
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// The covariance kernel
    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Posterior hyperparameter draws, empty before `fit`.
    #[must_use]
    pub fn posterior_samples(&self) -> &[HyperparameterSample] {
        &self.samples
    }

    /// Whether a successful `fit` has happened.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.training().is_ok()
    }

    /// Training inputs, if fitted.
    #[must_use]
    pub fn training_inputs(&self) -> Option<&DMatrix<f64>> {
        self.x_train.as_ref()
    }

    /// Training targets, if fitted.
    #[must_use]
    pub fn training_targets(&self) -> Option<&DVector<f64>> {
        self.y_train.as_ref()
    }

    /// Fit the model: store the data and draw hyperparameters from their
    /// posterior.
    ///
    /// Each hyperparameter carries an independent LogNormal(0, 1) prior;
    /// inference runs over `ln θ`, where that prior is a standard normal.
    /// On any sampler failure the error is surfaced and the model is left
    /// exactly as it was before the call.
    pub fn fit<S, R>(
        &mut self,
        x: DMatrix<f64>,
        y: DVector<f64>,
        sampler: &S,
        options: &SamplerOptions,
        rng: &mut R,
    ) -> Result<(), Error>
    where
        S: PosteriorSampler,
        R: Rng,
    {
        let x = self.coerce(&x)?;
        if x.nrows() != y.len() {
            return Err(Error::ShapeMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }

        let resid = match &self.mean_fn {
            Some(f) => &y - f(&x),
            None => y.clone(),
        };
        let input_dim = self.input_dim;
        let kernel = self.kernel.clone();
        let prior = Gaussian::standard();

        let ln_posterior = |t: &[f64]| -> f64 {
            let ln_prior: f64 = t.iter().map(|ti| prior.ln_f(ti)).sum();
            let sample =
                match HyperparameterSample::from_unconstrained(t, input_dim) {
                    Ok(s) => s,
                    Err(_) => return f64::NEG_INFINITY,
                };
            match ln_marginal(&kernel, &x, &resid, &sample) {
                Some(ln_lik) => ln_prior + ln_lik,
                None => f64::NEG_INFINITY,
            }
        };

        // prior median of every hyperparameter is exp(0) = 1
        let init = vec![0.0; input_dim + 2];
        let draws = sampler.sample(ln_posterior, &init, options, rng)?;
        if draws.is_empty() {
            return Err(Error::InferenceFailure(SamplerError::NoSamples));
        }

        let mut samples = Vec::with_capacity(draws.len());
        for draw in &draws {
            samples.push(HyperparameterSample::from_unconstrained(
                draw.as_slice(),
                input_dim,
            )?);
        }

        self.x_train = Some(x);
        self.y_train = Some(y);
        self.samples = samples;
        Ok(())
    }

    /// Predictive mean and posterior draws at the rows of `x`, marginalized
    /// over every stored hyperparameter sample.
    ///
    /// The per-sample conditionals are independent and run on the rayon
    /// thread pool, each with its own RNG split off `rng`. A sample whose
    /// training covariance cannot be decomposed (even after a 10x jitter
    /// retry) is skipped with a warning; the call only fails when every
    /// sample is unusable.
    ///
    /// `draws_per_sample` is clamped to at least 1.
    pub fn predict<R: Rng>(
        &self,
        x: &DMatrix<f64>,
        draws_per_sample: usize,
        rng: &mut R,
    ) -> Result<Prediction, Error> {
        let x_test = self.coerce(x)?;
        self.training()?;
        let n_draws = draws_per_sample.max(1);
        let n_test = x_test.nrows();

        let jobs: Vec<(usize, u64)> =
            (0..self.samples.len()).map(|i| (i, rng.gen())).collect();
        let results: Vec<(usize, Result<(DVector<f64>, DMatrix<f64>), Error>)> =
            jobs.into_par_iter()
                .map(|(i, seed)| {
                    let mut sample_rng =
                        Xoshiro256PlusPlus::seed_from_u64(seed);
                    let res = self.sample_prediction(
                        &x_test,
                        &self.samples[i],
                        n_draws,
                        &mut sample_rng,
                    );
                    (i, res)
                })
                .collect();

        let mut mean = DVector::zeros(n_test);
        let mut blocks: Vec<DMatrix<f64>> = Vec::with_capacity(results.len());
        let mut first_err: Option<Error> = None;
        for (i, res) in results {
            match res {
                Ok((mu, draws)) => {
                    mean += mu;
                    blocks.push(draws);
                }
                Err(e) => {
                    let e = match e {
                        Error::NumericalInstability { .. } => {
                            Error::NumericalInstability { sample_index: i }
                        }
                        other => other,
                    };
                    tracing::warn!(
                        sample_index = i,
                        error = %e,
                        "skipping hyperparameter sample in predict"
                    );
                    first_err.get_or_insert(e);
                }
            }
        }

        if blocks.is_empty() {
            return Err(first_err.unwrap_or(Error::UnfittedModel));
        }

        mean /= blocks.len() as f64;
        let mut draws = DMatrix::zeros(blocks.len() * n_draws, n_test);
        for (b, block) in blocks.iter().enumerate() {
            for r in 0..n_draws {
                for c in 0..n_test {
                    draws[(b * n_draws + r, c)] = block[(r, c)];
                }
            }
        }
        Prediction::new(mean, draws)
    }

    /// Posterior mean and draws conditioned on a single hyperparameter
    /// sample.
    ///
    /// Unlike [`predict`](Self::predict) this is strict: a failed covariance
    /// decomposition is an immediate error (reported with sample index 0).
    pub fn predict_with<R: Rng>(
        &self,
        x: &DMatrix<f64>,
        sample: &HyperparameterSample,
        draws_per_sample: usize,
        rng: &mut R,
    ) -> Result<(DVector<f64>, DMatrix<f64>), Error> {
        let x_test = self.coerce(x)?;
        self.training()?;
        self.sample_prediction(
            &x_test,
            sample,
            draws_per_sample.max(1),
            rng,
        )
    }

    /// Log marginal likelihood of the training data under one
    /// hyperparameter sample.
    pub fn ln_m_with(
        &self,
        sample: &HyperparameterSample,
    ) -> Result<f64, Error> {
        let (x, y) = self.training()?;
        let resid = self.residual(x, y);
        ln_marginal(&self.kernel, x, &resid, sample)
            .ok_or(Error::NumericalInstability { sample_index: 0 })
    }

    fn training(&self) -> Result<(&DMatrix<f64>, &DVector<f64>), Error> {
        match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) if !self.samples.is_empty() => Ok((x, y)),
            _ => Err(Error::UnfittedModel),
        }
    }

    fn residual(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> DVector<f64> {
        match &self.mean_fn {
            Some(f) => y - f(x),
            None => y.clone(),
        }
    }

    // Accept [n, input_dim] as-is; turn a single-row matrix into a column
    // when the model is one-dimensional.
    fn coerce(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, Error> {
        if x.ncols() == self.input_dim {
            Ok(x.clone())
        } else if self.input_dim == 1 && x.nrows() == 1 {
            Ok(x.transpose())
        } else {
            Err(Error::ShapeMismatch {
                expected: self.input_dim,
                got: x.ncols(),
            })
        }
    }

    fn sample_prediction<R: Rng>(
        &self,
        x_test: &DMatrix<f64>,
        sample: &HyperparameterSample,
        draws_per_sample: usize,
        rng: &mut R,
    ) -> Result<(DVector<f64>, DMatrix<f64>), Error> {
        let (x_train, y_train) = self.training()?;
        let params = sample.kernel_params()?;

        let k_train = self.kernel.covariance(
            x_train,
            x_train,
            &params,
            sample.noise(),
        )?;
        let chol = cholesky_with_retry(k_train)
            .ok_or(Error::NumericalInstability { sample_index: 0 })?;

        let resid = self.residual(x_train, y_train);
        let alpha = chol.solve(&resid);

        let k_cross =
            self.kernel.covariance(x_test, x_train, &params, 0.0)?;
        let mut mu = &k_cross * &alpha;
        if let Some(f) = &self.mean_fn {
            mu += f(x_test);
        }

        let v = chol.solve(&k_cross.transpose());
        let k_test = self.kernel.covariance(
            x_test,
            x_test,
            &params,
            sample.noise(),
        )?;
        let cov = k_test - &k_cross * &v;

        let mvn = match MvGaussian::new(mu.clone(), cov.clone()) {
            Ok(m) => m,
            Err(_) => {
                let mut bumped = cov;
                for i in 0..bumped.nrows() {
                    bumped[(i, i)] += 9.0 * JITTER;
                }
                MvGaussian::new(mu.clone(), bumped).map_err(|_| {
                    Error::NumericalInstability { sample_index: 0 }
                })?
            }
        };

        let ys = mvn.sample(draws_per_sample, rng);
        let draws = DMatrix::from_fn(draws_per_sample, x_test.nrows(), |i, j| {
            ys[i][j]
        });
        Ok((mu, draws))
    }
}

impl<K: Kernel> fmt::Debug for GaussianProcess<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaussianProcess")
            .field("input_dim", &self.input_dim)
            .field("kernel", &self.kernel)
            .field("mean_fn", &self.mean_fn.is_some())
            .field("n_train", &self.x_train.as_ref().map(DMatrix::nrows))
            .field("n_posterior_samples", &self.samples.len())
            .finish()
    }
}

impl<K: Kernel> Surrogate for GaussianProcess<K> {
    fn fit<S, R>(
        &mut self,
        x: DMatrix<f64>,
        y: DVector<f64>,
        sampler: &S,
        options: &SamplerOptions,
        rng: &mut R,
    ) -> Result<(), Error>
    where
        S: PosteriorSampler,
        R: Rng,
    {
        GaussianProcess::fit(self, x, y, sampler, options, rng)
    }

    fn predict<R: Rng>(
        &self,
        x: &DMatrix<f64>,
        draws_per_sample: usize,
        rng: &mut R,
    ) -> Result<Prediction, Error> {
        GaussianProcess::predict(self, x, draws_per_sample, rng)
    }
}

// Marginal log-likelihood of the residual targets under one hyperparameter
// sample, via the Cholesky factor of the training covariance (GPML eq 2.30).
fn ln_marginal<K: Kernel>(
    kernel: &K,
    x: &DMatrix<f64>,
    resid: &DVector<f64>,
    sample: &HyperparameterSample,
) -> Option<f64> {
    let params = sample.kernel_params().ok()?;
    let cov = kernel.covariance(x, x, &params, sample.noise()).ok()?;
    let chol = Cholesky::new(cov)?;
    let alpha = chol.solve(resid);
    let ln_det_half: f64 =
        chol.l_dirty().diagonal().iter().map(|v| v.ln()).sum();
    Some(
        (-0.5 * resid.dot(&alpha) - ln_det_half)
            - x.nrows() as f64 * HALF_LN_2PI,
    )
}

// One retry with 10x the default jitter before giving up on a sample.
fn cholesky_with_retry(k: DMatrix<f64>) -> Option<Cholesky<f64, Dyn>> {
    let n = k.nrows();
    match Cholesky::new(k.clone()) {
        Some(chol) => Some(chol),
        None => {
            let mut bumped = k;
            for i in 0..n {
                bumped[(i, i)] += 9.0 * JITTER;
            }
            Cholesky::new(bumped)
        }
    }
}
