//! Gaussian/Normal distribution over x in (-∞, ∞)
use std::f64::consts::SQRT_2;
use std::fmt;

use rand::Rng;
use rand_distr::StandardNormal;
use special::Error as _;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::HALF_LN_2PI;
use crate::traits::{Cdf, HasDensity, Sampleable};

/// Gaussian / Normal distribution, N(μ, σ).
///
/// # Example
///
/// ```
/// use krige::dist::Gaussian;
/// use krige::traits::{Cdf, HasDensity};
///
/// let g = Gaussian::standard();
/// assert!(g.f(&0.0) > g.f(&0.1));
/// assert!((g.cdf(&0.0) - 0.5).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Gaussian {
    mu: f64,
    sigma: f64,
}

/// Errors from `Gaussian` construction
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum GaussianError {
    /// The mu parameter is infinite or NaN
    MuNotFinite {
        /// Given mu
        mu: f64,
    },
    /// The sigma parameter is less than or equal to zero
    SigmaTooLow {
        /// Given sigma
        sigma: f64,
    },
    /// The sigma parameter is infinite or NaN
    SigmaNotFinite {
        /// Given sigma
        sigma: f64,
    },
}

impl Gaussian {
    /// Create a new Gaussian with mean `mu` and standard deviation `sigma`.
    pub fn new(mu: f64, sigma: f64) -> Result<Self, GaussianError> {
        if !mu.is_finite() {
            Err(GaussianError::MuNotFinite { mu })
        } else if sigma <= 0.0 {
            Err(GaussianError::SigmaTooLow { sigma })
        } else if !sigma.is_finite() {
            Err(GaussianError::SigmaNotFinite { sigma })
        } else {
            Ok(Self { mu, sigma })
        }
    }

    /// Create a new Gaussian without checking parameters.
    #[must_use]
    pub fn new_unchecked(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Standard normal, N(0, 1).
    #[must_use]
    pub fn standard() -> Self {
        Self { mu: 0.0, sigma: 1.0 }
    }

    /// Get mu
    #[must_use]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Get sigma
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Self::standard()
    }
}

impl HasDensity<f64> for Gaussian {
    fn ln_f(&self, x: &f64) -> f64 {
        let k = (x - self.mu) / self.sigma;
        (0.5 * k).mul_add(-k, -self.sigma.ln()) - HALF_LN_2PI
    }
}

impl Cdf<f64> for Gaussian {
    fn cdf(&self, x: &f64) -> f64 {
        let errf = ((x - self.mu) / (self.sigma * SQRT_2)).error();
        0.5 * (1.0 + errf)
    }
}

impl Sampleable<f64> for Gaussian {
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.sigma.mul_add(z, self.mu)
    }
}

impl std::error::Error for GaussianError {}

impl fmt::Display for GaussianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MuNotFinite { mu } => write!(f, "non-finite mu: {mu}"),
            Self::SigmaTooLow { sigma } => {
                write!(f, "sigma ({sigma}) must be greater than zero")
            }
            Self::SigmaNotFinite { sigma } => {
                write!(f, "non-finite sigma: {sigma}")
            }
        }
    }
}
