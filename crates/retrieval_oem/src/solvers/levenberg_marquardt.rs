//! Levenberg-Marquardt iteration with adaptive damping.

use nalgebra::{DMatrix, DVector};
use retrieval_core::ForwardModel;
use tracing::{debug, warn};

use crate::error::OemError;
use crate::kernel::{self, NormalKernel};
use crate::solvers::{RetrievalResult, RetrievalStatus};

/// Configuration for the Levenberg-Marquardt solver.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtConfig {
    /// Maximum trial steps, accepted and rejected combined
    pub max_iterations: usize,
    /// Convergence threshold on the relative cost improvement of an
    /// accepted step
    pub tolerance: f64,
    /// Initial damping parameter
    pub gamma_start: f64,
    /// Damping scale factor on an accepted step (< 1)
    pub gamma_scale_dec: f64,
    /// Damping scale factor on a rejected step (> 1)
    pub gamma_scale_inc: f64,
    /// Damping ceiling; exceeding it terminates the retrieval as diverged
    pub gamma_max: f64,
    /// Below this damping the trial step degenerates to plain Gauss-Newton
    /// and the damping term is dropped
    pub gamma_threshold: f64,
}

impl Default for LevenbergMarquardtConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            gamma_start: 1e-3,
            gamma_scale_dec: 0.1,
            gamma_scale_inc: 10.0,
            gamma_max: 1e12,
            gamma_threshold: 1e-6,
        }
    }
}

/// Damped Gauss-Newton solver for ill-conditioned or strongly nonlinear
/// retrievals.
///
/// Solves (Kᵢᵗ Se⁻¹ Kᵢ + Sa⁻¹ + γD) Δx = Kᵢᵗ Se⁻¹ (y − yᵢ) − Sa⁻¹ (xᵢ − xa)
/// and commits the step only if it strictly decreases the posterior cost,
/// so the accepted-cost sequence is monotonically decreasing. Acceptance
/// relaxes the damping (γ ← γ·gamma_scale_dec) and relinearises; rejection
/// tightens it (γ ← γ·gamma_scale_inc) and retries at the same
/// linearisation.
///
/// The damping matrix D is the diagonal of the normal matrix at the first
/// linearisation, held fixed for the whole run; with γ = 0 the update is
/// the undamped Gauss-Newton increment.
pub struct LevenbergMarquardt {
    config: LevenbergMarquardtConfig,
}

impl LevenbergMarquardt {
    /// Create a solver with default configuration.
    pub fn new() -> Self {
        Self {
            config: LevenbergMarquardtConfig::default(),
        }
    }

    /// Create a solver with custom configuration.
    pub fn with_config(config: LevenbergMarquardtConfig) -> Self {
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
    /// Trial-step costs are evaluated with `evaluate`; only accepted steps
    /// trigger a fresh `evaluate_jacobian`.
    ///
    /// # Errors
    ///
    /// - `OemError::DimensionMismatch` for inconsistent input sizes,
    ///   detected before the model is called
    /// - `OemError::SingularMatrix` if Se, Sa or a damped normal matrix
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
        let cfg = &self.config;
        let (m, n) = kernel::check_covariances(y, xa, se, sa)?;
        kernel::check_start(x0, n)?;
        let kernel = NormalKernel::factorise(se, sa)?;

        let mut x = x0.clone_owned();
        if cfg.max_iterations == 0 {
            return Ok(RetrievalResult {
                x,
                cost: f64::NAN,
                iterations: 0,
                model_evaluations: 0,
                status: RetrievalStatus::IterationLimit,
            });
        }

        let (yi, mut k) = model.evaluate_jacobian(&x);
        let mut model_evaluations = 1;
        kernel::check_prediction(&yi, m)?;
        kernel::check_jacobian(&k, m, n)?;

        let mut dy = y - &yi;
        let mut cost = kernel.cost(&dy, &(&x - xa));
        // Damping diagonal fixed for the whole run.
        let damping = kernel.normal_matrix(&k).diagonal();

        let mut gamma = cfg.gamma_start;
        let mut iterations = 0;
        let mut status = RetrievalStatus::IterationLimit;

        while iterations < cfg.max_iterations {
            iterations += 1;

            let mut h = kernel.normal_matrix(&k);
            if gamma >= cfg.gamma_threshold {
                for i in 0..n {
                    h[(i, i)] += gamma * damping[i];
                }
            }
            let g = kernel.gradient(&k, &dy, &(&x - xa));
            let step = kernel::solve_spd(h, &g, "the damped normal matrix")?;

            let x_trial = &x + &step;
            let y_trial = model.evaluate(&x_trial);
            model_evaluations += 1;
            kernel::check_prediction(&y_trial, m)?;
            let cost_trial = kernel.cost(&(y - &y_trial), &(&x_trial - xa));

            if cost_trial < cost {
                let improvement = (cost - cost_trial) / cost.max(f64::MIN_POSITIVE);
                x = x_trial;
                cost = cost_trial;
                gamma *= cfg.gamma_scale_dec;
                debug!(
                    "levenberg-marquardt trial {} accepted: cost {:.6e}, gamma {:.3e}",
                    iterations, cost, gamma
                );

                if improvement < cfg.tolerance {
                    status = RetrievalStatus::Converged;
                    break;
                }

                let (yi, k_next) = model.evaluate_jacobian(&x);
                model_evaluations += 1;
                kernel::check_prediction(&yi, m)?;
                kernel::check_jacobian(&k_next, m, n)?;
                k = k_next;
                dy = y - &yi;
            } else {
                gamma *= cfg.gamma_scale_inc;
                debug!(
                    "levenberg-marquardt trial {} rejected: cost {:.6e} -> {:.6e}, gamma {:.3e}",
                    iterations, cost, cost_trial, gamma
                );
                if gamma > cfg.gamma_max {
                    warn!(
                        "levenberg-marquardt diverged: gamma {:.3e} exceeds ceiling {:.3e}",
                        gamma, cfg.gamma_max
                    );
                    status = RetrievalStatus::Diverged;
                    break;
                }
            }
        }

        Ok(RetrievalResult {
            x,
            cost,
            iterations,
            model_evaluations,
            status,
        })
    }
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use retrieval_core::LinearForwardModel;

    #[test]
    fn test_scalar_retrieval_converges() {
        let y = DVector::from_element(1, 2.0);
        let xa = DVector::from_element(1, 0.0);
        let se = DMatrix::identity(1, 1);
        let sa = DMatrix::identity(1, 1);
        let mut model = LinearForwardModel::new(DMatrix::identity(1, 1));

        let result = LevenbergMarquardt::new()
            .solve(&mut model, &y, &xa, &se, &sa)
            .unwrap();

        assert!(result.converged());
        assert_relative_eq!(result.x[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_iteration_budget_leaves_start_untouched() {
        let y = DVector::from_element(1, 2.0);
        let xa = DVector::from_element(1, 0.0);
        let se = DMatrix::identity(1, 1);
        let sa = DMatrix::identity(1, 1);
        let mut model = LinearForwardModel::new(DMatrix::identity(1, 1));

        let solver = LevenbergMarquardt::with_config(LevenbergMarquardtConfig {
            max_iterations: 0,
            ..LevenbergMarquardtConfig::default()
        });
        let x0 = DVector::from_element(1, -4.0);
        let result = solver
            .solve_from(&mut model, &y, &xa, &se, &sa, &x0)
            .unwrap();

        assert_eq!(result.status, RetrievalStatus::IterationLimit);
        assert_eq!(result.model_evaluations, 0);
        assert_eq!(result.x, x0);
    }

    #[test]
    fn test_unusable_model_diverges() {
        // A model that never produces a finite prediction: every trial is
        // rejected and gamma runs into its ceiling.
        struct Broken;

        impl ForwardModel for Broken {
            fn evaluate(&mut self, x: &DVector<f64>) -> DVector<f64> {
                DVector::from_element(x.len(), f64::NAN)
            }

            fn evaluate_jacobian(&mut self, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
                (self.evaluate(x), DMatrix::identity(x.len(), x.len()))
            }
        }

        let y = DVector::from_element(1, 1.0);
        let xa = DVector::from_element(1, 0.0);
        let se = DMatrix::identity(1, 1);
        let sa = DMatrix::identity(1, 1);

        let result = LevenbergMarquardt::new()
            .solve(&mut Broken, &y, &xa, &se, &sa)
            .unwrap();
        assert_eq!(result.status, RetrievalStatus::Diverged);
    }
}
