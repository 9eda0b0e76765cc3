//! Surrogate models over functions
//!
//! The [`Surrogate`] trait is the minimal capability a surrogate model must
//! expose: learn from observations, then produce a posterior-predictive
//! distribution at new points. Acquisition functions that only need the
//! predictive distribution are generic over it.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::sampler::{PosteriorSampler, SamplerOptions};
use crate::Error;

pub mod gaussian;

pub use gaussian::Prediction;

/// A model that can be fit to observations and queried for a posterior
/// predictive distribution.
pub trait Surrogate {
    /// Learn from the observations `(x, y)`, drawing model hyperparameters
    /// from their posterior with `sampler`.
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
        R: Rng;

    /// Predictive mean and posterior draws at the rows of `x`.
    fn predict<R: Rng>(
        &self,
        x: &DMatrix<f64>,
        draws_per_sample: usize,
        rng: &mut R,
    ) -> Result<Prediction, Error>;
}
