//! Probability distributions backing the GP machinery

mod gaussian;
mod mvg;

pub use gaussian::{Gaussian, GaussianError};
pub use mvg::{MvGaussian, MvGaussianError};
