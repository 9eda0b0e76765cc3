//! Gaussian process surrogate models with fully Bayesian hyperparameter
//! treatment.
//!
//! A [`GaussianProcess`](process::gaussian::GaussianProcess) is fit by drawing
//! kernel hyperparameters and the observation noise from their posterior with
//! an MCMC sampler, then predictions marginalize over those draws. The
//! resulting empirical posterior-predictive distribution feeds the
//! [`acquisition`] functions used to rank candidate points in sequential
//! experiment design.
//!
//! # Example
//!
//! Fit a GP to a handful of observations and score candidates with expected
//! improvement:
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use krige::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(0xABCD);
//!
//! let x = DMatrix::from_column_slice(5, 1, &[0.0, 1.0, 2.0, 3.0, 4.0]);
//! let y = DVector::from_column_slice(&[0.0, 0.8, 0.9, 0.1, -0.8]);
//!
//! let mut gp = GaussianProcess::new(SquaredExp, 1);
//! let sampler = RandomWalkMetropolis::default();
//! let options = SamplerOptions::default()
//!     .with_warmup(200)
//!     .with_draws(100);
//!
//! gp.fit(x, y, &sampler, &options, &mut rng).unwrap();
//!
//! let candidates = DMatrix::from_column_slice(3, 1, &[0.5, 2.5, 3.5]);
//! let scores = expected_improvement(&gp, &candidates, 0.01, false, &mut rng)
//!     .unwrap();
//! assert_eq!(scores.len(), 3);
//! assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));
//! ```

pub mod acquisition;
pub mod consts;
pub mod dist;
mod error;
pub mod kernel;
pub mod prelude;
pub mod process;
pub mod sampler;
pub mod traits;

pub use error::Error;
