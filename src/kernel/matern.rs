use nalgebra::DMatrix;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{
    add_diag_noise, check_inputs, scaled_sq_dist, Kernel, KernelError,
    KernelParams,
};

// Keeps the kernel differentiable at r = 0, where sqrt has a singular
// derivative.
const R2_EPS: f64 = 1e-12;

/// Matérn kernel with ν = 5/2
///
/// ```math
///     k(\mathbf{x}, \mathbf{x'}) = \sigma^2
///         \left(1 + \sqrt{5} r + \tfrac{5}{3} r^2\right)
///         \exp\left(-\sqrt{5} r\right)
/// ```
///
/// with `r = sqrt(r² + ε)` for the length-scale-normalized Euclidean
/// distance `r²`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct Matern52;

impl Kernel for Matern52 {
    fn covariance(
        &self,
        x1: &DMatrix<f64>,
        x2: &DMatrix<f64>,
        params: &KernelParams,
        noise: f64,
    ) -> Result<DMatrix<f64>, KernelError> {
        check_inputs(x1, x2, params)?;

        let m = x1.nrows();
        let n = x2.nrows();
        let sig2 = params.signal_variance();
        let ell = params.length_scale();
        let sqrt5 = 5.0_f64.sqrt();

        let mut cov: DMatrix<f64> = DMatrix::zeros(m, n);
        for i in 0..m {
            for j in 0..n {
                let r2 = scaled_sq_dist(x1, x2, i, j, ell);
                let r = (r2 + R2_EPS).sqrt();
                cov[(i, j)] = sig2
                    * (5.0 / 3.0_f64).mul_add(r2, sqrt5.mul_add(r, 1.0))
                    * (-sqrt5 * r).exp();
            }
        }

        add_diag_noise(&mut cov, x1, x2, noise);
        Ok(cov)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{SquaredExp, JITTER};
    use nalgebra::DVector;

    const TOL: f64 = 1E-10;

    #[test]
    fn unit_distance_value() {
        let x = DMatrix::from_column_slice(3, 1, &[0.0, 1.0, 2.0]);
        let params = KernelParams::isotropic(1.0, 1.0).unwrap();
        let cov = Matern52.covariance(&x, &x, &params, 0.0).unwrap();

        assert::close(cov[(0, 1)], 0.523_994_108_831_353_9, 1E-9);
        assert::close(cov[(0, 2)], 0.138_660_219_138_433_16, 1E-9);
        // diagonal is σ² (up to the sqrt regularizer) plus jitter
        for i in 0..3 {
            assert::close(cov[(i, i)], 1.0 + JITTER, 1E-5);
        }
    }

    #[test]
    fn symmetric_on_same_inputs() {
        let x = DMatrix::from_row_slice(
            4,
            2,
            &[0.1, -0.3, 1.2, 0.8, -2.0, 0.5, 0.9, 0.9],
        );
        let params = KernelParams::new(
            DVector::from_column_slice(&[0.7, 1.4]),
            2.0,
        )
        .unwrap();
        let cov = Matern52.covariance(&x, &x, &params, 0.1).unwrap();

        assert!(cov.relative_eq(&cov.transpose(), 1E-12, 1E-12));
    }

    #[test]
    fn ard_length_scales() {
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let b = DMatrix::from_row_slice(1, 2, &[3.0, 4.0]);
        let params = KernelParams::new(
            DVector::from_column_slice(&[0.5, 2.0]),
            1.5,
        )
        .unwrap();
        let cov = Matern52.covariance(&a, &b, &params, 0.0).unwrap();
        assert::close(
            cov[(0, 0)],
            5.729_949_273_410_715e-3 + JITTER,
            1E-10,
        );
    }

    #[test]
    fn decays_slower_than_squared_exponential() {
        let x = DMatrix::from_column_slice(2, 1, &[0.0, 3.0]);
        let params = KernelParams::isotropic(1.0, 1.0).unwrap();
        let m = Matern52.covariance(&x, &x, &params, 0.0).unwrap();
        let s = SquaredExp.covariance(&x, &x, &params, 0.0).unwrap();
        assert!(m[(0, 1)] > s[(0, 1)]);
    }
}
