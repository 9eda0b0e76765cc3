//! Multivariate Gaussian distribution, 𝒩(μ, Σ)
use std::fmt;

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::consts::LN_2PI;
use crate::traits::{HasDensity, Sampleable};

/// Multivariate Gaussian distribution 𝒩(μ, Σ).
///
/// The covariance is factored once at construction, so repeated draws only
/// cost a matrix-vector product.
///
/// # Example
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use krige::dist::MvGaussian;
/// use krige::traits::Sampleable;
///
/// let mvg = MvGaussian::standard(3).unwrap();
/// let mut rng = rand::thread_rng();
/// let x: DVector<f64> = mvg.draw(&mut rng);
/// assert_eq!(x.len(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct MvGaussian {
    mu: DVector<f64>,
    cov: DMatrix<f64>,
    // Lower Cholesky factor of cov
    chol_l: DMatrix<f64>,
}

/// Errors from `MvGaussian` construction
#[derive(Clone, Debug, PartialEq)]
pub enum MvGaussianError {
    /// The mean and covariance do not have matching dimensions
    DimensionMismatch {
        /// Length of mu
        mu_len: usize,
        /// Number of covariance rows
        cov_rows: usize,
    },
    /// The covariance matrix is not square
    CovNotSquare {
        /// Number of rows
        nrows: usize,
        /// Number of columns
        ncols: usize,
    },
    /// The covariance matrix is not positive definite
    CovNotPositiveDefinite,
    /// Requested zero dimensions
    ZeroDimension,
}

impl MvGaussian {
    /// Create a new multivariate Gaussian with mean `mu` and covariance
    /// `cov`.
    pub fn new(
        mu: DVector<f64>,
        cov: DMatrix<f64>,
    ) -> Result<Self, MvGaussianError> {
        if cov.nrows() != cov.ncols() {
            Err(MvGaussianError::CovNotSquare {
                nrows: cov.nrows(),
                ncols: cov.ncols(),
            })
        } else if mu.len() != cov.nrows() {
            Err(MvGaussianError::DimensionMismatch {
                mu_len: mu.len(),
                cov_rows: cov.nrows(),
            })
        } else {
            match Cholesky::new(cov.clone()) {
                Some(chol) => Ok(Self {
                    mu,
                    cov,
                    chol_l: chol.unpack(),
                }),
                None => Err(MvGaussianError::CovNotPositiveDefinite),
            }
        }
    }

    /// Standard multivariate Gaussian, 𝒩(0, I).
    pub fn standard(dims: usize) -> Result<Self, MvGaussianError> {
        if dims == 0 {
            Err(MvGaussianError::ZeroDimension)
        } else {
            Self::new(DVector::zeros(dims), DMatrix::identity(dims, dims))
        }
    }

    /// Number of dimensions
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.mu.len()
    }

    /// Get the mean vector
    #[must_use]
    pub fn mu(&self) -> &DVector<f64> {
        &self.mu
    }

    /// Get the covariance matrix
    #[must_use]
    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }
}

impl HasDensity<DVector<f64>> for MvGaussian {
    fn ln_f(&self, x: &DVector<f64>) -> f64 {
        let diff = x - &self.mu;
        match self.chol_l.solve_lower_triangular(&diff) {
            Some(w) => {
                let ln_det_half: f64 =
                    self.chol_l.diagonal().iter().map(|v| v.ln()).sum();
                let n = self.mu.len() as f64;
                -0.5 * (n * LN_2PI + w.dot(&w)) - ln_det_half
            }
            None => f64::NEG_INFINITY,
        }
    }
}

impl Sampleable<DVector<f64>> for MvGaussian {
    fn draw<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        let z = DVector::from_fn(self.mu.len(), |_, _| {
            rng.sample::<f64, _>(StandardNormal)
        });
        &self.mu + &self.chol_l * z
    }
}

impl std::error::Error for MvGaussianError {}

impl fmt::Display for MvGaussianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { mu_len, cov_rows } => write!(
                f,
                "mu has {mu_len} dimensions but cov has {cov_rows} rows"
            ),
            Self::CovNotSquare { nrows, ncols } => {
                write!(f, "cov must be square, got {nrows}x{ncols}")
            }
            Self::CovNotPositiveDefinite => {
                write!(f, "cov is not positive definite")
            }
            Self::ZeroDimension => write!(f, "ndims must be >= 1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1E-12;

    #[test]
    fn new_checks_shapes() {
        let mu = DVector::zeros(3);
        assert!(MvGaussian::new(mu.clone(), DMatrix::identity(3, 3)).is_ok());
        assert!(matches!(
            MvGaussian::new(mu.clone(), DMatrix::identity(4, 4)),
            Err(MvGaussianError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            MvGaussian::new(mu, DMatrix::identity(3, 2)),
            Err(MvGaussianError::CovNotSquare { .. })
        ));
    }

    #[test]
    fn new_rejects_indefinite_cov() {
        let mu = DVector::zeros(2);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            MvGaussian::new(mu, cov),
            Err(MvGaussianError::CovNotPositiveDefinite)
        ));
    }

    #[test]
    fn ln_f_standard_x_zeros() {
        let mvg = MvGaussian::standard(3).unwrap();
        let x = DVector::<f64>::zeros(3);
        assert::close(mvg.ln_f(&x), -2.756_815_599_614_018, TOL);
    }

    #[test]
    fn ln_f_standard_x_nonzeros() {
        let mvg = MvGaussian::standard(3).unwrap();
        let x = DVector::from_column_slice(&[0.5, 3.1, -6.2]);
        assert::close(mvg.ln_f(&x), -26.906_815_599_614_02, TOL);
    }

    #[test]
    fn sample_returns_proper_number_of_draws() {
        let cov = DMatrix::from_row_slice(
            3,
            3,
            &[
                1.017_427_88,
                0.365_866_52,
                -0.656_204_86,
                0.365_866_52,
                1.005_645_53,
                -0.425_972_61,
                -0.656_204_86,
                -0.425_972_61,
                1.272_479_72,
            ],
        );
        let mu = DVector::from_column_slice(&[0.5, 3.1, -6.2]);
        let mvg = MvGaussian::new(mu, cov).unwrap();

        let mut rng = rand::thread_rng();
        let xs = mvg.sample(103, &mut rng);
        assert_eq!(xs.len(), 103);
    }

    #[test]
    fn draw_covariance_recovered() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(0xFEED);
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.8, 0.8, 1.0]);
        let mu = DVector::from_column_slice(&[1.0, -1.0]);
        let mvg = MvGaussian::new(mu, cov).unwrap();

        let n = 50_000;
        let xs = mvg.sample(n, &mut rng);
        let m0 = xs.iter().map(|x| x[0]).sum::<f64>() / n as f64;
        let m1 = xs.iter().map(|x| x[1]).sum::<f64>() / n as f64;
        let c01 = xs
            .iter()
            .map(|x| (x[0] - m0) * (x[1] - m1))
            .sum::<f64>()
            / n as f64;

        assert::close(m0, 1.0, 0.05);
        assert::close(m1, -1.0, 0.05);
        assert::close(c01, 0.8, 0.05);
    }
}
