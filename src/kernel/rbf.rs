use nalgebra::DMatrix;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{
    add_diag_noise, check_inputs, scaled_sq_dist, Kernel, KernelError,
    KernelParams,
};

/// Squared-exponential (RBF) kernel
///
/// ```math
///     k(\mathbf{x}, \mathbf{x'}) = \sigma^2 \exp\left(-\frac{r^2}{2}\right)
/// ```
///
/// where `r²` is the squared Euclidean distance normalized by the
/// per-dimension length-scales.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct SquaredExp;

impl Kernel for SquaredExp {
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

        let mut cov: DMatrix<f64> = DMatrix::zeros(m, n);
        for i in 0..m {
            for j in 0..n {
                let r2 = scaled_sq_dist(x1, x2, i, j, ell);
                cov[(i, j)] = sig2 * (-0.5 * r2).exp();
            }
        }

        add_diag_noise(&mut cov, x1, x2, noise);
        Ok(cov)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::JITTER;
    use nalgebra::DVector;

    const TOL: f64 = 1E-10;

    #[test]
    fn diagonal_block_gets_noise_and_jitter() {
        let x = DMatrix::from_column_slice(3, 1, &[0.0, 1.0, 2.0]);
        let params = KernelParams::isotropic(1.0, 1.0).unwrap();
        let cov = SquaredExp.covariance(&x, &x, &params, 0.0).unwrap();

        for i in 0..3 {
            assert::close(cov[(i, i)], 1.0 + JITTER, TOL);
        }
        assert::close(cov[(0, 1)], (-0.5_f64).exp(), TOL);
        assert::close(cov[(0, 2)], (-2.0_f64).exp(), TOL);

        let noisy = SquaredExp.covariance(&x, &x, &params, 0.3).unwrap();
        for i in 0..3 {
            assert::close(noisy[(i, i)], 1.3 + JITTER, TOL);
        }
    }

    #[test]
    fn cross_block_is_not_jittered() {
        let x = DMatrix::from_column_slice(3, 1, &[0.0, 1.0, 2.0]);
        let y = DMatrix::from_column_slice(2, 1, &[0.0, 1.0]);
        let params = KernelParams::isotropic(1.0, 1.0).unwrap();
        let cov = SquaredExp.covariance(&x, &y, &params, 0.5).unwrap();

        assert_eq!(cov.shape(), (3, 2));
        assert::close(cov[(0, 0)], 1.0, TOL);
        assert::close(cov[(1, 1)], 1.0, TOL);
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
        let cov = SquaredExp.covariance(&x, &x, &params, 0.1).unwrap();

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
        // same shape, so the single diagonal entry picks up jitter
        let cov = SquaredExp.covariance(&a, &b, &params, 0.0).unwrap();
        assert::close(
            cov[(0, 0)],
            3.052_025_535_159_662_7e-4 + JITTER,
            1E-12,
        );
    }

    #[test]
    fn scales_with_signal_variance() {
        let x = DMatrix::from_column_slice(2, 1, &[0.0, 1.0]);
        let p1 = KernelParams::isotropic(1.0, 1.0).unwrap();
        let p2 = KernelParams::isotropic(1.0, 3.0).unwrap();
        let c1 = SquaredExp.covariance(&x, &x, &p1, 0.0).unwrap();
        let c2 = SquaredExp.covariance(&x, &x, &p2, 0.0).unwrap();
        assert::close(c2[(0, 1)], 3.0 * c1[(0, 1)], TOL);
    }
}
