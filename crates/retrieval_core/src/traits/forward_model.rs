//! The forward-model interface consumed by the iterative solvers.

use nalgebra::{DMatrix, DVector};

/// Interface between the nonlinear retrieval solvers and a forward
/// simulation.
///
/// A forward model maps a candidate state vector `x` (length n) to a
/// predicted measurement vector (length m). The Jacobian is the m×n matrix
/// of partial derivatives of the predicted measurement with respect to the
/// state components, evaluated at `x`.
///
/// # Contract
///
/// - `evaluate_jacobian` subsumes a model evaluation: the returned
///   prediction and Jacobian belong to the same state, so the solvers issue
///   exactly one call per linearisation.
/// - The methods take `&mut self` because implementations commonly cache
///   intermediate simulation state between calls; the solvers make no
///   assumption that repeated calls at the same `x` are free, and may
///   re-evaluate.
/// - The solvers hold no model state of their own, so independent
///   retrievals can run in parallel threads as long as each owns its model.
///
/// # Examples
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use retrieval_core::ForwardModel;
///
/// /// y = [x0^2, x0 + x1]
/// struct Parabola;
///
/// impl ForwardModel for Parabola {
///     fn evaluate(&mut self, x: &DVector<f64>) -> DVector<f64> {
///         DVector::from_vec(vec![x[0] * x[0], x[0] + x[1]])
///     }
///
///     fn evaluate_jacobian(&mut self, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
///         let y = self.evaluate(x);
///         let k = DMatrix::from_row_slice(2, 2, &[2.0 * x[0], 0.0, 1.0, 1.0]);
///         (y, k)
///     }
/// }
///
/// let mut model = Parabola;
/// let (y, k) = model.evaluate_jacobian(&DVector::from_vec(vec![3.0, 1.0]));
/// assert_eq!(y[0], 9.0);
/// assert_eq!(k[(0, 0)], 6.0);
/// ```
pub trait ForwardModel {
    /// Compute the predicted measurement for state `x`.
    fn evaluate(&mut self, x: &DVector<f64>) -> DVector<f64>;

    /// Compute the predicted measurement and its Jacobian at `x` in one
    /// call.
    fn evaluate_jacobian(&mut self, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>);
}

/// Forward model that is exactly linear: y = K·x.
///
/// The Jacobian is the fixed operator `K` itself, independent of the state.
/// Useful for callers with a genuinely linear instrument response and for
/// exercising solvers against the closed-form linear retrieval.
#[derive(Debug, Clone)]
pub struct LinearForwardModel {
    k: DMatrix<f64>,
}

impl LinearForwardModel {
    /// Build a linear model from its fixed operator `K` (m×n).
    pub fn new(k: DMatrix<f64>) -> Self {
        Self { k }
    }

    /// The fixed operator `K`.
    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.k
    }
}

impl ForwardModel for LinearForwardModel {
    fn evaluate(&mut self, x: &DVector<f64>) -> DVector<f64> {
        &self.k * x
    }

    fn evaluate_jacobian(&mut self, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
        (&self.k * x, self.k.clone())
    }
}
