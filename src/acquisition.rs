//! Acquisition functions for sequential experiment design
//!
//! Each function consumes a fitted surrogate and a candidate point set and
//! returns one score per candidate. Expected improvement, upper confidence
//! bound, and uncertainty exploration aggregate over every posterior
//! hyperparameter sample through [`Surrogate::predict`]; Thompson sampling
//! instead conditions on a single sample drawn at random — there the
//! randomness is the decision mechanism, not noise to average out.
//!
//! All functions are pure with respect to the model and idempotent under a
//! fixed RNG seed.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::dist::Gaussian;
use crate::kernel::Kernel;
use crate::process::gaussian::{GaussianProcess, Prediction};
use crate::process::Surrogate;
use crate::traits::{Cdf, HasDensity};
use crate::Error;

/// Default exploration margin for expected improvement.
pub const DEFAULT_XI: f64 = 0.01;
/// Default exploration weight for the upper confidence bound.
pub const DEFAULT_BETA: f64 = 0.25;

/// Expected improvement over the best value seen across the posterior
/// draws.
///
/// `xi` trades exploitation against exploration; `maximize` selects the
/// optimization direction. Candidates with zero predictive spread score
/// exactly zero.
pub fn expected_improvement<M, R>(
    model: &M,
    x: &DMatrix<f64>,
    xi: f64,
    maximize: bool,
    rng: &mut R,
) -> Result<DVector<f64>, Error>
where
    M: Surrogate,
    R: Rng,
{
    let pred = model.predict(x, 1, rng)?;
    Ok(ei_scores(&pred, xi, maximize))
}

/// Expected-improvement scores for an existing prediction.
#[must_use]
pub fn ei_scores(
    pred: &Prediction,
    xi: f64,
    maximize: bool,
) -> DVector<f64> {
    let mu = pred.draw_mean();
    let sigma = pred.draw_std();
    let best = pred.best();
    let std_normal = Gaussian::standard();

    DVector::from_fn(mu.len(), |j, _| {
        if sigma[j] <= 0.0 {
            0.0
        } else {
            let mut u = (mu[j] - best - xi) / sigma[j];
            if !maximize {
                u = -u;
            }
            sigma[j] * u.mul_add(std_normal.cdf(&u), std_normal.f(&u))
        }
    })
}

/// Upper (or lower, when minimizing) confidence bound.
///
/// `beta` scales the predictive variance; `beta = 0` collapses to the raw
/// predictive mean regardless of direction.
pub fn upper_confidence_bound<M, R>(
    model: &M,
    x: &DMatrix<f64>,
    beta: f64,
    maximize: bool,
    rng: &mut R,
) -> Result<DVector<f64>, Error>
where
    M: Surrogate,
    R: Rng,
{
    let pred = model.predict(x, 1, rng)?;
    Ok(ucb_scores(&pred, beta, maximize))
}

/// Confidence-bound scores for an existing prediction.
#[must_use]
pub fn ucb_scores(
    pred: &Prediction,
    beta: f64,
    maximize: bool,
) -> DVector<f64> {
    let mu = pred.draw_mean();
    let var = pred.draw_variance();

    DVector::from_fn(mu.len(), |j, _| {
        let delta = (beta * var[j]).sqrt();
        if maximize {
            mu[j] + delta
        } else {
            mu[j] - delta
        }
    })
}

/// Pure exploration: the per-candidate variance of the posterior draws.
pub fn uncertainty_exploration<M, R>(
    model: &M,
    x: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DVector<f64>, Error>
where
    M: Surrogate,
    R: Rng,
{
    Ok(model.predict(x, 1, rng)?.draw_variance())
}

/// Thompson sampling: one function draw from the posterior.
///
/// Picks a hyperparameter sample uniformly at random and returns a single
/// predictive draw conditioned on it. Reproducible under a fixed RNG seed;
/// with a single stored sample this is exactly the single-sample
/// prediction.
pub fn thompson_sampling<K, R>(
    model: &GaussianProcess<K>,
    x: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DVector<f64>, Error>
where
    K: Kernel,
    R: Rng,
{
    let samples = model.posterior_samples();
    if samples.is_empty() {
        return Err(Error::UnfittedModel);
    }
    let idx = if samples.len() > 1 {
        rng.gen_range(0..samples.len())
    } else {
        0
    };
    let sample = samples[idx].clone();
    let (_, draws) = model.predict_with(x, &sample, 1, rng)?;
    Ok(draws.row(0).transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SquaredExp;
    use crate::sampler::{RandomWalkMetropolis, SamplerOptions};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TOL: f64 = 1E-9;

    // col 0 has mean 1 and unit spread; col 1 is degenerate at the best
    // value 5
    fn two_candidate_prediction() -> Prediction {
        let mean = DVector::from_column_slice(&[1.0, 5.0]);
        let draws =
            DMatrix::from_row_slice(2, 2, &[0.0, 5.0, 2.0, 5.0]);
        Prediction::new(mean, draws).unwrap()
    }

    fn fitted_gp(draws: usize) -> GaussianProcess<SquaredExp> {
        let mut rng = StdRng::seed_from_u64(0xACE);
        let x = DMatrix::from_column_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = DVector::from_column_slice(&[0.0, 1.0, 0.0, -1.0]);
        let mut gp = GaussianProcess::new(SquaredExp, 1);
        let options = SamplerOptions::default()
            .with_warmup(200)
            .with_draws(draws);
        gp.fit(x, y, &RandomWalkMetropolis::default(), &options, &mut rng)
            .unwrap();
        gp
    }

    #[test]
    fn ei_zero_where_spread_is_zero() {
        let pred = two_candidate_prediction();
        let scores = ei_scores(&pred, DEFAULT_XI, false);
        assert_eq!(scores[1], 0.0);
        let scores = ei_scores(&pred, DEFAULT_XI, true);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn ei_known_values() {
        let pred = two_candidate_prediction();

        let minimize = ei_scores(&pred, 0.01, false);
        assert::close(minimize[0], 4.010_006_835_149_135, TOL);

        let maximize = ei_scores(&pred, 0.01, true);
        assert::close(maximize[0], 6.835_149_135_988_306e-6, TOL);
    }

    #[test]
    fn ei_is_nonnegative() {
        let pred = two_candidate_prediction();
        for maximize in [false, true] {
            let scores = ei_scores(&pred, DEFAULT_XI, maximize);
            assert!(scores.iter().all(|s| *s >= 0.0));
        }
    }

    #[test]
    fn ucb_beta_zero_is_the_draw_mean() {
        let pred = two_candidate_prediction();
        let mu = pred.draw_mean();
        for maximize in [false, true] {
            let scores = ucb_scores(&pred, 0.0, maximize);
            assert!(scores.relative_eq(&mu, 1E-12, 1E-12));
        }
    }

    #[test]
    fn ucb_direction() {
        let pred = two_candidate_prediction();
        // col 0 spread: variance 1
        let up = ucb_scores(&pred, 1.0, true);
        let down = ucb_scores(&pred, 1.0, false);
        assert::close(up[0], 2.0, TOL);
        assert::close(down[0], 0.0, TOL);
    }

    #[test]
    fn exploration_prefers_gaps_between_observations() {
        let gp = fitted_gp(100);
        let mut rng = StdRng::seed_from_u64(1);
        // one candidate inside the observed range, one far outside
        let x = DMatrix::from_column_slice(2, 1, &[1.5, 30.0]);
        let scores = uncertainty_exploration(&gp, &x, &mut rng).unwrap();
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn thompson_is_reproducible() {
        let gp = fitted_gp(50);
        let x = DMatrix::from_column_slice(3, 1, &[0.5, 1.5, 2.5]);

        let mut rng_a = StdRng::seed_from_u64(9);
        let a = thompson_sampling(&gp, &x, &mut rng_a).unwrap();
        let mut rng_b = StdRng::seed_from_u64(9);
        let b = thompson_sampling(&gp, &x, &mut rng_b).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn thompson_with_one_sample_is_single_sample_predict() {
        let gp = fitted_gp(1);
        assert_eq!(gp.posterior_samples().len(), 1);
        let x = DMatrix::from_column_slice(2, 1, &[0.5, 2.5]);

        let mut rng_a = StdRng::seed_from_u64(13);
        let ts = thompson_sampling(&gp, &x, &mut rng_a).unwrap();

        let mut rng_b = StdRng::seed_from_u64(13);
        let sample = gp.posterior_samples()[0].clone();
        let (_, draws) =
            gp.predict_with(&x, &sample, 1, &mut rng_b).unwrap();

        assert_eq!(ts, draws.row(0).transpose());
    }

    #[test]
    fn unfitted_model_is_rejected() {
        let gp = GaussianProcess::new(SquaredExp, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let x = DMatrix::from_column_slice(1, 1, &[0.0]);

        assert_eq!(
            expected_improvement(&gp, &x, DEFAULT_XI, false, &mut rng)
                .unwrap_err(),
            Error::UnfittedModel
        );
        assert_eq!(
            thompson_sampling(&gp, &x, &mut rng).unwrap_err(),
            Error::UnfittedModel
        );
    }
}
