//! Shared normal-equation kernel.
//!
//! Every solver in this crate reduces to the same Bayesian normal equations;
//! this module owns the covariance factorisations, the three update forms,
//! the posterior cost and the input validation. The closed-form linear
//! retrieval calls these once, the iterative solvers once per linearisation.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::error::OemError;

/// Factorised measurement and prior covariances for one solver invocation.
///
/// Both covariances must be symmetric positive definite; a failed Cholesky
/// factorisation surfaces as [`OemError::SingularMatrix`] before any
/// iteration runs.
pub(crate) struct NormalKernel<'a> {
    se: &'a DMatrix<f64>,
    sa: &'a DMatrix<f64>,
    se_chol: Cholesky<f64, Dyn>,
    sa_chol: Cholesky<f64, Dyn>,
    sa_inv: DMatrix<f64>,
}

impl<'a> NormalKernel<'a> {
    /// Factorise Se and Sa.
    pub(crate) fn factorise(
        se: &'a DMatrix<f64>,
        sa: &'a DMatrix<f64>,
    ) -> Result<Self, OemError> {
        let se_chol =
            Cholesky::new(se.clone()).ok_or(OemError::SingularMatrix { matrix: "Se" })?;
        let sa_chol =
            Cholesky::new(sa.clone()).ok_or(OemError::SingularMatrix { matrix: "Sa" })?;
        let sa_inv = sa_chol.inverse();
        Ok(Self {
            se,
            sa,
            se_chol,
            sa_chol,
            sa_inv,
        })
    }

    /// Posterior cost J = dyᵗ Se⁻¹ dy + dxᵗ Sa⁻¹ dx for the residual
    /// dy = y − y(x) and prior departure dx = x − xa.
    pub(crate) fn cost(&self, dy: &DVector<f64>, dx: &DVector<f64>) -> f64 {
        dy.dot(&self.se_chol.solve(dy)) + dx.dot(&self.sa_chol.solve(dx))
    }

    /// Se⁻¹ applied to a matrix via the factorisation.
    pub(crate) fn se_solve(&self, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        self.se_chol.solve(rhs)
    }

    /// State-space normal matrix Kᵗ Se⁻¹ K + Sa⁻¹.
    pub(crate) fn normal_matrix(&self, k: &DMatrix<f64>) -> DMatrix<f64> {
        k.tr_mul(&self.se_chol.solve(k)) + &self.sa_inv
    }

    /// Cost gradient direction Kᵗ Se⁻¹ dy − Sa⁻¹ dx (half the negative
    /// gradient of J).
    pub(crate) fn gradient(&self, k: &DMatrix<f64>, dy: &DVector<f64>, dx: &DVector<f64>) -> DVector<f64> {
        k.tr_mul(&self.se_chol.solve(dy)) - &self.sa_inv * dx
    }

    /// n-form update: (Kᵗ Se⁻¹ K + Sa⁻¹)⁻¹ Kᵗ Se⁻¹ d.
    ///
    /// Returned relative to xa; inverts an n×n matrix.
    pub(crate) fn n_form(&self, k: &DMatrix<f64>, d: &DVector<f64>) -> Result<DVector<f64>, OemError> {
        let rhs = k.tr_mul(&self.se_chol.solve(d));
        solve_spd(self.normal_matrix(k), &rhs, "the n-form normal matrix")
    }

    /// m-form update: Sa Kᵗ (K Sa Kᵗ + Se)⁻¹ d.
    ///
    /// Returned relative to xa; inverts an m×m matrix.
    pub(crate) fn m_form(&self, k: &DMatrix<f64>, d: &DVector<f64>) -> Result<DVector<f64>, OemError> {
        let gram = k * (self.sa * k.transpose()) + self.se;
        let w = solve_spd(gram, d, "the m-form normal matrix")?;
        Ok(self.sa * k.tr_mul(&w))
    }

    /// Standard-form update: (Kᵗ Se⁻¹ K + Sa⁻¹)⁻¹ (Kᵗ Se⁻¹ d + Sa⁻¹ xa).
    ///
    /// Returns the new state directly; the prior enters through the
    /// Sa⁻¹ xa term instead of an xa offset.
    pub(crate) fn standard(
        &self,
        k: &DMatrix<f64>,
        d: &DVector<f64>,
        xa: &DVector<f64>,
    ) -> Result<DVector<f64>, OemError> {
        let rhs = k.tr_mul(&self.se_chol.solve(d)) + &self.sa_inv * xa;
        solve_spd(self.normal_matrix(k), &rhs, "the standard-form normal matrix")
    }
}

/// Solve A x = b for symmetric positive definite A.
pub(crate) fn solve_spd(
    a: DMatrix<f64>,
    b: &DVector<f64>,
    name: &'static str,
) -> Result<DVector<f64>, OemError> {
    let chol = Cholesky::new(a).ok_or(OemError::SingularMatrix { matrix: name })?;
    Ok(chol.solve(b))
}

/// Validate y against Se and xa against Sa, returning (m, n).
pub(crate) fn check_covariances(
    y: &DVector<f64>,
    xa: &DVector<f64>,
    se: &DMatrix<f64>,
    sa: &DMatrix<f64>,
) -> Result<(usize, usize), OemError> {
    let m = y.len();
    let n = xa.len();
    check("rows of Se", m, se.nrows())?;
    check("columns of Se", m, se.ncols())?;
    check("rows of Sa", n, sa.nrows())?;
    check("columns of Sa", n, sa.ncols())?;
    Ok((m, n))
}

/// Validate a Jacobian (fixed or model-produced) against (m, n).
pub(crate) fn check_jacobian(k: &DMatrix<f64>, m: usize, n: usize) -> Result<(), OemError> {
    check("rows of K", m, k.nrows())?;
    check("columns of K", n, k.ncols())
}

/// Validate a starting state against n.
pub(crate) fn check_start(x0: &DVector<f64>, n: usize) -> Result<(), OemError> {
    check("the start vector", n, x0.len())
}

/// Validate a model-produced prediction against m.
pub(crate) fn check_prediction(y_pred: &DVector<f64>, m: usize) -> Result<(), OemError> {
    check("the predicted measurement", m, y_pred.len())
}

fn check(quantity: &'static str, expected: usize, actual: usize) -> Result<(), OemError> {
    if expected == actual {
        Ok(())
    } else {
        Err(OemError::DimensionMismatch {
            quantity,
            expected,
            actual,
        })
    }
}
