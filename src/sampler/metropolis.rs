use nalgebra::DVector;
use rand::Rng;
use rand_distr::StandardNormal;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{PosteriorSampler, SamplerError, SamplerOptions};

// Warmup iterations per step-size adaptation window.
const ADAPT_WINDOW: usize = 50;
// Attempts at finding a finite-density jittered start before giving up on
// the exact init point.
const INIT_TRIES: usize = 10;

/// Adaptive Gaussian random-walk Metropolis sampler.
///
/// Proposals are isotropic Gaussian steps in the unconstrained space. During
/// warmup the step size is adapted every 50 iterations toward the target
/// acceptance rate; it is frozen for the retained draws. Each
/// chain starts from the supplied initialization plus Gaussian jitter so
/// chains do not collapse onto one trajectory.
///
/// Gradient-free, which keeps the model side of the contract to a bare log
/// density. Any sampler implementing [`PosteriorSampler`] can be swapped in.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct RandomWalkMetropolis {
    step_size: f64,
    target_accept: f64,
    init_jitter: f64,
}

impl RandomWalkMetropolis {
    /// Create a sampler with the given initial proposal step size.
    #[must_use]
    pub fn new(step_size: f64) -> Self {
        Self {
            step_size,
            ..Self::default()
        }
    }

    /// Set the acceptance rate the warmup adaptation aims for.
    #[must_use]
    pub fn with_target_accept(self, target_accept: f64) -> Self {
        Self {
            target_accept,
            ..self
        }
    }

    /// Set the stddev of the jitter applied to each chain's start.
    #[must_use]
    pub fn with_init_jitter(self, init_jitter: f64) -> Self {
        Self {
            init_jitter,
            ..self
        }
    }

    fn transition<F, R>(
        &self,
        pos: &mut Vec<f64>,
        ln_p: &mut f64,
        step: f64,
        ln_posterior: &F,
        rng: &mut R,
    ) -> bool
    where
        F: Fn(&[f64]) -> f64,
        R: Rng,
    {
        let proposal: Vec<f64> = pos
            .iter()
            .map(|&v| step.mul_add(rng.sample::<f64, _>(StandardNormal), v))
            .collect();
        let ln_p_prop = ln_posterior(&proposal);

        let ln_ratio = ln_p_prop - *ln_p;
        let accept = ln_p_prop.is_finite()
            && (ln_ratio >= 0.0 || rng.gen::<f64>().ln() < ln_ratio);
        if accept {
            *pos = proposal;
            *ln_p = ln_p_prop;
        }
        accept
    }

    fn run_chain<F, R>(
        &self,
        ln_posterior: &F,
        init: &[f64],
        options: &SamplerOptions,
        out: &mut Vec<DVector<f64>>,
        rng: &mut R,
    ) -> Result<(), SamplerError>
    where
        F: Fn(&[f64]) -> f64,
        R: Rng,
    {
        let mut pos = init.to_vec();
        let mut ln_p = f64::NEG_INFINITY;
        for attempt in 0..INIT_TRIES {
            let jitter = if attempt == INIT_TRIES - 1 {
                // last resort: the un-jittered init point
                0.0
            } else {
                self.init_jitter
            };
            pos = init
                .iter()
                .map(|&v| {
                    jitter.mul_add(rng.sample::<f64, _>(StandardNormal), v)
                })
                .collect();
            ln_p = ln_posterior(&pos);
            if ln_p.is_finite() {
                break;
            }
        }
        if !ln_p.is_finite() {
            return Err(SamplerError::NonFiniteInit);
        }

        let mut step = self.step_size;
        let mut accepted = 0_usize;
        for iter in 0..options.warmup {
            if self.transition(&mut pos, &mut ln_p, step, ln_posterior, rng) {
                accepted += 1;
            }
            if (iter + 1) % ADAPT_WINDOW == 0 {
                let rate = accepted as f64 / ADAPT_WINDOW as f64;
                step *= (rate - self.target_accept).exp();
                step = step.clamp(1e-8, 1e2);
                accepted = 0;
            }
        }

        for _ in 0..options.draws {
            self.transition(&mut pos, &mut ln_p, step, ln_posterior, rng);
            out.push(DVector::from_column_slice(&pos));
        }
        Ok(())
    }
}

impl Default for RandomWalkMetropolis {
    fn default() -> Self {
        Self {
            step_size: 0.1,
            target_accept: 0.3,
            init_jitter: 0.1,
        }
    }
}

impl PosteriorSampler for RandomWalkMetropolis {
    fn sample<F, R>(
        &self,
        ln_posterior: F,
        init: &[f64],
        options: &SamplerOptions,
        rng: &mut R,
    ) -> Result<Vec<DVector<f64>>, SamplerError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
        R: Rng,
    {
        let mut out =
            Vec::with_capacity(options.draws * options.chains.max(1));
        for _ in 0..options.chains {
            self.run_chain(&ln_posterior, init, options, &mut out, rng)?;
        }

        if out.is_empty() {
            Err(SamplerError::NoSamples)
        } else {
            Ok(out)
        }
    }
}
