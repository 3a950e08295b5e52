//! Retrieval characterisation for a linearisation at the solution.
//!
//! A retrieved state is only half the answer; these diagnostics say how
//! much of it came from the measurement rather than the prior. All
//! quantities share the state-space normal matrix with the n-form solvers
//! and fail with the same error taxonomy.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::OemError;
use crate::kernel::{self, NormalKernel};

/// Linear diagnostics of a retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalDiagnostics {
    /// Contribution (gain) matrix G = (Kᵗ Se⁻¹ K + Sa⁻¹)⁻¹ Kᵗ Se⁻¹, n×m
    pub gain: DMatrix<f64>,
    /// Averaging kernel A = G·K, n×n
    pub averaging_kernel: DMatrix<f64>,
    /// Posterior covariance Ŝ = (Kᵗ Se⁻¹ K + Sa⁻¹)⁻¹, n×n
    pub posterior_covariance: DMatrix<f64>,
    /// Measurement degrees of freedom, trace(A)
    pub degrees_of_freedom: f64,
}

/// Characterise a retrieval from its Jacobian and the two covariances.
///
/// `k` is the linearisation of the forward model, conventionally taken at
/// the retrieved state.
///
/// # Errors
///
/// - `OemError::DimensionMismatch` if Se and Sa do not match the Jacobian
/// - `OemError::SingularMatrix` if a factorisation fails
pub fn retrieval_diagnostics(
    k: &DMatrix<f64>,
    se: &DMatrix<f64>,
    sa: &DMatrix<f64>,
) -> Result<RetrievalDiagnostics, OemError> {
    // Reuse the y/xa validation with stand-in vectors of the Jacobian's
    // own dimensions.
    let m = k.nrows();
    let n = k.ncols();
    kernel::check_covariances(&DVector::zeros(m), &DVector::zeros(n), se, sa)?;

    let kernel = NormalKernel::factorise(se, sa)?;
    let normal = kernel.normal_matrix(k);
    let posterior_covariance = Cholesky::new(normal)
        .ok_or(OemError::SingularMatrix {
            matrix: "the n-form normal matrix",
        })?
        .inverse();

    // G = Ŝ Kᵗ Se⁻¹; Se is symmetric, so Kᵗ Se⁻¹ = (Se⁻¹ K)ᵗ.
    let gain = &posterior_covariance * kernel.se_solve(k).transpose();
    let averaging_kernel = &gain * k;
    let degrees_of_freedom = averaging_kernel.trace();

    Ok(RetrievalDiagnostics {
        gain,
        averaging_kernel,
        posterior_covariance,
        degrees_of_freedom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_identity_problem() {
        // Unit prior and measurement variance, identity model: half the
        // information comes from the measurement.
        let k = DMatrix::identity(1, 1);
        let se = DMatrix::identity(1, 1);
        let sa = DMatrix::identity(1, 1);

        let diag = retrieval_diagnostics(&k, &se, &sa).unwrap();
        assert_relative_eq!(diag.gain[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(diag.averaging_kernel[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(diag.posterior_covariance[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(diag.degrees_of_freedom, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_measurement_dominates() {
        // Tiny measurement noise: the averaging kernel approaches identity
        // and the measurement provides close to n degrees of freedom.
        let k = DMatrix::identity(2, 2);
        let se = DMatrix::identity(2, 2) * 1e-10;
        let sa = DMatrix::identity(2, 2);

        let diag = retrieval_diagnostics(&k, &se, &sa).unwrap();
        assert_relative_eq!(diag.degrees_of_freedom, 2.0, epsilon = 1e-6);
        assert_relative_eq!(
            diag.averaging_kernel,
            DMatrix::identity(2, 2),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_covariance_shape_is_validated() {
        let k = DMatrix::identity(2, 2);
        let se = DMatrix::identity(3, 3);
        let sa = DMatrix::identity(2, 2);

        let result = retrieval_diagnostics(&k, &se, &sa);
        assert!(matches!(result, Err(OemError::DimensionMismatch { .. })));
    }
}
