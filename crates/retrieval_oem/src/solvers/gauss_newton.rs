//! Gauss-Newton iteration for nonlinear forward models.

use nalgebra::{DMatrix, DVector};
use retrieval_core::ForwardModel;
use tracing::debug;

use crate::error::OemError;
use crate::kernel::{self, NormalKernel};
use crate::solvers::{RetrievalResult, RetrievalStatus};

/// Which matrix form computes the Gauss-Newton update.
///
/// All three converge to the same fixed point; they differ only in the
/// dimension and conditioning of the inverted matrix. Selection is explicit
/// and never inferred from the input sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaussNewtonForm {
    /// State-space update with the prior folded in as a Sa⁻¹·xa term
    Standard,
    /// State-space update relative to xa; inverts an n×n matrix
    NForm,
    /// Measurement-space update relative to xa; inverts an m×m matrix
    MForm,
}

/// Configuration for the Gauss-Newton solver.
#[derive(Debug, Clone)]
pub struct GaussNewtonConfig {
    /// Update form
    pub form: GaussNewtonForm,
    /// Maximum committed state updates
    pub max_iterations: usize,
    /// Convergence threshold on the relative cost decrease
    pub tolerance: f64,
}

impl Default for GaussNewtonConfig {
    fn default() -> Self {
        Self {
            form: GaussNewtonForm::Standard,
            max_iterations: 30,
            tolerance: 1e-6,
        }
    }
}

/// Gauss-Newton solver: iterative relinearisation converging to the
/// Bayesian maximum-a-posteriori estimate.
///
/// At each iterate the forward model is linearised and the local problem is
/// solved with the same normal-equation kernel as the closed-form linear
/// retrieval, treating y − yᵢ + Kᵢ·xᵢ as the measurement of a linear model.
/// For an exactly linear forward model the first iteration therefore lands
/// on the linear-retrieval solution from any starting point.
///
/// A step may increase the cost for strongly nonlinear models; that shows
/// up in the convergence status rather than as an error, and is the reason
/// the Levenberg-Marquardt variant exists.
pub struct GaussNewton {
    config: GaussNewtonConfig,
}

impl GaussNewton {
    /// Create a solver with default configuration.
    pub fn new() -> Self {
        Self {
            config: GaussNewtonConfig::default(),
        }
    }

    /// Create a solver with custom configuration.
    pub fn with_config(config: GaussNewtonConfig) -> Self {
        Self { config }
    }

    /// Retrieve starting from the prior mean xa.
    pub fn solve<M>(
        &self,
        model: &mut M,
        y: &DVector<f64>,
        xa: &DVector<f64>,
        se: &DMatrix<f64>,
        sa: &DMatrix<f64>,
    ) -> Result<RetrievalResult, OemError>
    where
        M: ForwardModel,
    {
        self.solve_from(model, y, xa, se, sa, xa)
    }

    /// Retrieve starting from an arbitrary state `x0`.
    ///
    /// # Errors
    ///
    /// - `OemError::DimensionMismatch` for inconsistent input sizes,
    ///   detected before the model is called
    /// - `OemError::SingularMatrix` if Se, Sa or the active normal matrix
    ///   cannot be factorised; the covariances are factorised before the
    ///   first iteration
    pub fn solve_from<M>(
        &self,
        model: &mut M,
        y: &DVector<f64>,
        xa: &DVector<f64>,
        se: &DMatrix<f64>,
        sa: &DMatrix<f64>,
        x0: &DVector<f64>,
    ) -> Result<RetrievalResult, OemError>
    where
        M: ForwardModel,
    {
        let (m, n) = kernel::check_covariances(y, xa, se, sa)?;
        kernel::check_start(x0, n)?;
        let kernel = NormalKernel::factorise(se, sa)?;

        let mut x = x0.clone_owned();
        let mut cost = f64::NAN;
        let mut cost_prev: Option<f64> = None;
        let mut model_evaluations = 0;

        for iteration in 0..self.config.max_iterations {
            let (yi, k) = model.evaluate_jacobian(&x);
            model_evaluations += 1;
            kernel::check_prediction(&yi, m)?;
            kernel::check_jacobian(&k, m, n)?;

            let dy = y - &yi;
            let dx = &x - xa;
            cost = kernel.cost(&dy, &dx);

            if let Some(prev) = cost_prev {
                let change = (prev - cost).abs() / prev.max(f64::MIN_POSITIVE);
                if change < self.config.tolerance {
                    debug!(
                        "gauss-newton ({:?}) converged after {} iterations, cost {:.6e}",
                        self.config.form, iteration, cost
                    );
                    return Ok(RetrievalResult {
                        x,
                        cost,
                        iterations: iteration,
                        model_evaluations,
                        status: RetrievalStatus::Converged,
                    });
                }
            }
            cost_prev = Some(cost);

            x = match self.config.form {
                GaussNewtonForm::Standard => kernel.standard(&k, &(&dy + &k * &x), xa)?,
                GaussNewtonForm::NForm => xa + kernel.n_form(&k, &(&dy + &k * &dx))?,
                GaussNewtonForm::MForm => xa + kernel.m_form(&k, &(&dy + &k * &dx))?,
            };
            debug!(
                "gauss-newton ({:?}) iteration {}: cost {:.6e}",
                self.config.form, iteration, cost
            );
        }

        Ok(RetrievalResult {
            x,
            cost,
            iterations: self.config.max_iterations,
            model_evaluations,
            status: RetrievalStatus::IterationLimit,
        })
    }
}

impl Default for GaussNewton {
    fn default() -> Self {
        Self::new()
    }
}
