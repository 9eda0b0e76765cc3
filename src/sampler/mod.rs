//! Posterior sampling boundary
//!
//! The GP model hands a log-joint density over unconstrained hyperparameter
//! coordinates to a [`PosteriorSampler`] and gets back a flat sequence of
//! draws. Chain identity is deliberately absent from the contract; it only
//! matters to convergence diagnostics, which live with the sampler.

use std::fmt;

use nalgebra::DVector;
use rand::Rng;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

mod metropolis;

pub use metropolis::RandomWalkMetropolis;

/// Draws samples from a posterior given its unnormalized log density.
///
/// Implementations may use any MCMC scheme, gradient-based or not, provided
/// the returned draws approximate independent samples from the density. The
/// density is `Sync` so samplers are free to run chains in parallel.
pub trait PosteriorSampler {
    /// Draw `options.draws × options.chains` samples from `ln_posterior`,
    /// starting near `init`.
    fn sample<F, R>(
        &self,
        ln_posterior: F,
        init: &[f64],
        options: &SamplerOptions,
        rng: &mut R,
    ) -> Result<Vec<DVector<f64>>, SamplerError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
        R: Rng;
}

/// Warmup, draw, and chain counts for posterior sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct SamplerOptions {
    /// Number of warmup (adaptation) iterations per chain, discarded.
    pub warmup: usize,
    /// Number of retained draws per chain.
    pub draws: usize,
    /// Number of independent chains.
    pub chains: usize,
}

impl SamplerOptions {
    /// Set the number of warmup iterations.
    #[must_use]
    pub fn with_warmup(self, warmup: usize) -> Self {
        Self { warmup, ..self }
    }

    /// Set the number of retained draws per chain.
    #[must_use]
    pub fn with_draws(self, draws: usize) -> Self {
        Self { draws, ..self }
    }

    /// Set the number of chains.
    #[must_use]
    pub fn with_chains(self, chains: usize) -> Self {
        Self { chains, ..self }
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            warmup: 2000,
            draws: 2000,
            chains: 1,
        }
    }
}

/// Errors from posterior sampling
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum SamplerError {
    /// The sampler produced an empty draw sequence.
    NoSamples,
    /// The log density was not finite at any usable starting point.
    NonFiniteInit,
    /// The sampler was cancelled or exceeded its time budget.
    Timeout,
}

impl std::error::Error for SamplerError {}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSamples => write!(f, "sampler returned zero samples"),
            Self::NonFiniteInit => {
                write!(f, "log density non-finite at initialization")
            }
            Self::Timeout => write!(f, "sampling timed out"),
        }
    }
}
