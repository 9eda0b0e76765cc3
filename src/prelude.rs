//! Re-imports for convenience
#[doc(no_inline)]
pub use crate::acquisition::{
    ei_scores, expected_improvement, thompson_sampling, ucb_scores,
    uncertainty_exploration, upper_confidence_bound, DEFAULT_BETA,
    DEFAULT_XI,
};
#[doc(no_inline)]
pub use crate::kernel::{
    Kernel, KernelError, KernelParams, Matern52, SquaredExp, JITTER,
};
#[doc(no_inline)]
pub use crate::process::gaussian::{
    GaussianProcess, HyperparameterSample, Prediction,
};
#[doc(no_inline)]
pub use crate::process::Surrogate;
#[doc(no_inline)]
pub use crate::sampler::{
    PosteriorSampler, RandomWalkMetropolis, SamplerError, SamplerOptions,
};
#[doc(no_inline)]
pub use crate::traits::*;
#[doc(no_inline)]
pub use crate::Error;
