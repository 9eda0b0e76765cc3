use std::fmt;

use crate::kernel::KernelError;
use crate::sampler::SamplerError;

/// Errors arising from fitting or querying a surrogate model.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Input dimensionality or length does not match what the model expects.
    ShapeMismatch {
        /// Size the model expected
        expected: usize,
        /// Size it was given
        got: usize,
    },
    /// A covariance decomposition failed even after extra jitter.
    NumericalInstability {
        /// Index of the hyperparameter sample whose covariance failed
        sample_index: usize,
    },
    /// The posterior sampler failed to produce usable draws.
    InferenceFailure(SamplerError),
    /// `predict` or an acquisition function was called before a successful
    /// `fit`.
    UnfittedModel,
    /// A kernel rejected its hyperparameters.
    Kernel(KernelError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {expected}, got {got}")
            }
            Self::NumericalInstability { sample_index } => write!(
                f,
                "covariance decomposition failed for hyperparameter sample \
                 {sample_index}"
            ),
            Self::InferenceFailure(e) => {
                write!(f, "posterior sampling failed: {e}")
            }
            Self::UnfittedModel => {
                write!(f, "model queried before a successful fit")
            }
            Self::Kernel(e) => write!(f, "kernel error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InferenceFailure(e) => Some(e),
            Self::Kernel(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SamplerError> for Error {
    fn from(e: SamplerError) -> Self {
        Self::InferenceFailure(e)
    }
}

impl From<KernelError> for Error {
    fn from(e: KernelError) -> Self {
        Self::Kernel(e)
    }
}
