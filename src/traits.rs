//! Capability traits for distributions

use rand::Rng;

/// Has a density function over values of type `X`.
pub trait HasDensity<X> {
    /// Probability density at `x`.
    fn f(&self, x: &X) -> f64 {
        self.ln_f(x).exp()
    }

    /// Log probability density at `x`.
    fn ln_f(&self, x: &X) -> f64;
}

/// Can be sampled from.
pub trait Sampleable<X> {
    /// Single draw.
    fn draw<R: Rng>(&self, rng: &mut R) -> X;

    /// Multiple draws.
    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<X> {
        (0..n).map(|_| self.draw(rng)).collect()
    }
}

/// Has a cumulative distribution function.
pub trait Cdf<X>: HasDensity<X> {
    /// The value of the CDF at `x`.
    fn cdf(&self, x: &X) -> f64;
}
