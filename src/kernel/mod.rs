//! Covariance kernels
//!
//! A [`Kernel`] is a pure function from two point sets and a set of
//! hyperparameters to a covariance matrix. Hyperparameters are passed per
//! call rather than stored, so one kernel value can serve every posterior
//! draw.

use std::fmt;

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

mod matern;
mod rbf;

pub use matern::Matern52;
pub use rbf::SquaredExp;

/// Jitter added to diagonal blocks so training covariance matrices stay
/// invertible with near-duplicate inputs or zero observation noise.
pub const JITTER: f64 = 1e-6;

/// Kernel function
pub trait Kernel:
    fmt::Debug + Clone + PartialEq + Send + Sync + 'static
{
    /// Covariance between the rows of `x1` and the rows of `x2`.
    ///
    /// When `x1` and `x2` have identical shape the block is treated as a
    /// diagonal (train/train or test/test) block and `noise + JITTER` is
    /// added to its diagonal; cross blocks are left untouched. Passing the
    /// same array on both sides when a diagonal block is wanted is the
    /// caller's responsibility.
    fn covariance(
        &self,
        x1: &DMatrix<f64>,
        x2: &DMatrix<f64>,
        params: &KernelParams,
        noise: f64,
    ) -> Result<DMatrix<f64>, KernelError>;
}

/// Hyperparameters shared by all kernels: a per-dimension length-scale and a
/// signal variance.
///
/// A length-scale vector of length 1 is broadcast over every input
/// dimension; any other length must match the dimensionality of the points
/// the kernel is evaluated on.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct KernelParams {
    length_scale: DVector<f64>,
    signal_variance: f64,
}

impl KernelParams {
    /// Create a new parameter set with per-dimension length-scales.
    pub fn new(
        length_scale: DVector<f64>,
        signal_variance: f64,
    ) -> Result<Self, KernelError> {
        if length_scale.is_empty()
            || length_scale.iter().any(|l| *l <= 0.0 || !l.is_finite())
        {
            let worst = length_scale
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min);
            Err(KernelError::ParameterOutOfBounds {
                name: "length_scale",
                given: worst,
                bounds: (0.0, f64::INFINITY),
            })
        } else if signal_variance <= 0.0 || !signal_variance.is_finite() {
            Err(KernelError::ParameterOutOfBounds {
                name: "signal_variance",
                given: signal_variance,
                bounds: (0.0, f64::INFINITY),
            })
        } else {
            Ok(Self {
                length_scale,
                signal_variance,
            })
        }
    }

    /// Create a parameter set with a single length-scale broadcast over all
    /// input dimensions.
    pub fn isotropic(
        length_scale: f64,
        signal_variance: f64,
    ) -> Result<Self, KernelError> {
        Self::new(DVector::from_element(1, length_scale), signal_variance)
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
}

/// Errors from kernel evaluation
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum KernelError {
    /// Parameter out of bounds
    ParameterOutOfBounds {
        /// Name of the parameter
        name: &'static str,
        /// Value given
        given: f64,
        /// Lower and upper bounds on the value
        bounds: (f64, f64),
    },
    /// The two point sets have different dimensionality
    DimensionMismatch {
        /// Columns of the left point set
        left: usize,
        /// Columns of the right point set
        right: usize,
    },
    /// The length-scale vector matches neither 1 nor the input dimension
    LengthScaleMismatch {
        /// Number of length-scales given
        given: usize,
        /// Input dimension
        input_dim: usize,
    },
}

impl std::error::Error for KernelError {}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterOutOfBounds {
                name,
                given,
                bounds,
            } => write!(
                f,
                "parameter {name} is out of bounds ({}, {}), given: {given}",
                bounds.0, bounds.1
            ),
            Self::DimensionMismatch { left, right } => write!(
                f,
                "point sets have different dimensionality: {left} vs {right}"
            ),
            Self::LengthScaleMismatch { given, input_dim } => write!(
                f,
                "{given} length-scales for {input_dim}-dimensional inputs"
            ),
        }
    }
}

/// Squared, length-scale-normalized Euclidean distance between row `i` of
/// `x1` and row `j` of `x2`, clamped at zero.
pub(crate) fn scaled_sq_dist(
    x1: &DMatrix<f64>,
    x2: &DMatrix<f64>,
    i: usize,
    j: usize,
    ell: &DVector<f64>,
) -> f64 {
    let d = x1.ncols();
    let mut r2 = 0.0;
    for k in 0..d {
        let lk = if ell.len() == 1 { ell[0] } else { ell[k] };
        let t = (x1[(i, k)] - x2[(j, k)]) / lk;
        r2 += t * t;
    }
    r2.max(0.0)
}

/// Shared preconditions for covariance evaluation.
pub(crate) fn check_inputs(
    x1: &DMatrix<f64>,
    x2: &DMatrix<f64>,
    params: &KernelParams,
) -> Result<(), KernelError> {
    if x1.ncols() != x2.ncols() {
        return Err(KernelError::DimensionMismatch {
            left: x1.ncols(),
            right: x2.ncols(),
        });
    }
    let n_ell = params.length_scale().len();
    if n_ell != 1 && n_ell != x1.ncols() {
        return Err(KernelError::LengthScaleMismatch {
            given: n_ell,
            input_dim: x1.ncols(),
        });
    }
    Ok(())
}

/// Add `noise + JITTER` to the diagonal when the two point sets share a
/// shape.
pub(crate) fn add_diag_noise(
    cov: &mut DMatrix<f64>,
    x1: &DMatrix<f64>,
    x2: &DMatrix<f64>,
    noise: f64,
) {
    if x1.shape() == x2.shape() {
        for i in 0..cov.nrows() {
            cov[(i, i)] += noise + JITTER;
        }
    }
}
