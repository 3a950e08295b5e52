//! Iterative retrieval solvers.
//!
//! This module implements the nonlinear inversion algorithms:
//! - Gauss-Newton in three algebraically equivalent forms
//! - Levenberg-Marquardt with adaptive damping
//!
//! Both repeatedly relinearise a [`ForwardModel`](retrieval_core::ForwardModel)
//! and feed the linearisation through the same normal-equation kernel as the
//! closed-form linear retrieval.

mod gauss_newton;
mod levenberg_marquardt;

pub use gauss_newton::{GaussNewton, GaussNewtonConfig, GaussNewtonForm};
pub use levenberg_marquardt::{LevenbergMarquardt, LevenbergMarquardtConfig};

use nalgebra::DVector;

/// Terminal outcome of an iterative retrieval.
///
/// Non-convergence is an expected, recoverable condition: the caller can
/// retry with adjusted parameters or accept the last iterate. Only
/// structural failures (dimensions, singular matrices) are reported as
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStatus {
    /// The convergence criterion was met
    Converged,
    /// The iteration budget was exhausted before meeting the tolerance
    IterationLimit,
    /// Levenberg-Marquardt only: gamma exceeded its ceiling without an
    /// acceptable step, so the damping strategy could not stabilise the
    /// iteration
    Diverged,
}

/// Retrieval result.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Final state estimate (the last iterate, never rolled back)
    pub x: DVector<f64>,
    /// Posterior cost at `x`; NaN if the budget allowed no evaluation
    pub cost: f64,
    /// Committed state updates (Gauss-Newton) or trial steps
    /// (Levenberg-Marquardt, accepted and rejected)
    pub iterations: usize,
    /// Number of forward-model calls
    pub model_evaluations: usize,
    /// Terminal outcome
    pub status: RetrievalStatus,
}

impl RetrievalResult {
    /// Whether the solver met its convergence criterion.
    pub fn converged(&self) -> bool {
        self.status == RetrievalStatus::Converged
    }
}
