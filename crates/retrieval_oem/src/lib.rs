//! Optimal estimation method (OEM) inversion engine.
//!
//! Estimates an unknown state vector from a noisy measurement by combining
//! a forward model, a prior estimate with covariance Sa and a
//! measurement-error covariance Se, following Bayesian
//! (Tikhonov-regularised) least-squares theory.
//!
//! ## Solvers
//!
//! - [`LinearOem`]: closed-form posterior mean for an exactly linear
//!   forward operator, in the n-form or m-form
//! - [`GaussNewton`]: iterative relinearisation for nonlinear models,
//!   in standard, n-form or m-form
//! - [`LevenbergMarquardt`]: damped Gauss-Newton with adaptive step
//!   control for ill-conditioned or strongly nonlinear problems
//!
//! All nonlinear solvers consume the
//! [`ForwardModel`](retrieval_core::ForwardModel) interface from
//! `retrieval_core` and share one normal-equation kernel with the linear
//! solver.
//!
//! ## Errors and outcomes
//!
//! Structural failures (inconsistent dimensions, singular matrices) are
//! [`OemError`] values raised before or at the offending factorisation.
//! Convergence outcomes, including Levenberg-Marquardt divergence, are
//! [`RetrievalStatus`](solvers::RetrievalStatus) values so batch callers
//! can keep going.
//!
//! ## Example
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use retrieval_oem::{LinearForm, LinearOem};
//!
//! // Equal trust in prior and measurement splits the difference.
//! let y = DVector::from_element(1, 2.0);
//! let xa = DVector::from_element(1, 0.0);
//! let k = DMatrix::identity(1, 1);
//! let se = DMatrix::identity(1, 1);
//! let sa = DMatrix::identity(1, 1);
//!
//! let x = LinearOem::new(LinearForm::NForm)
//!     .solve(&y, &xa, &k, &se, &sa)
//!     .unwrap();
//! assert!((x[0] - 1.0).abs() < 1e-12);
//! ```

pub mod diagnostics;
pub mod error;
mod kernel;
pub mod linear;
pub mod solvers;

pub use diagnostics::{retrieval_diagnostics, RetrievalDiagnostics};
pub use error::OemError;
pub use linear::{LinearForm, LinearOem};
pub use solvers::{
    GaussNewton, GaussNewtonConfig, GaussNewtonForm, LevenbergMarquardt,
    LevenbergMarquardtConfig, RetrievalResult, RetrievalStatus,
};
