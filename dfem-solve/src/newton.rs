//! Newton's method for `r(u, p) = 0`.

use dfem::SolveScalar;
use tracing::{debug, info_span};

use crate::backend::LinearBackend;
use crate::convergence::{norm, NewtonConfig};
use crate::error::{check_shape, FemError};
use crate::problem::{residual_norm, Problem};

/// Slack of the equilibrium check over the Newton stopping rule.
const EQUILIBRIUM_SLACK: f64 = 100.0;

/// Solves the discrete equilibrium for given parameters. Holds only
/// read-only configuration, so one solver serves any number of calls.
#[derive(Debug)]
pub struct EquilibriumSolver<'a, P> {
    problem: &'a P,
    backend: LinearBackend,
    config: NewtonConfig,
    linear: bool,
}

impl<'a, P: Problem> EquilibriumSolver<'a, P> {
    /// `linear = true` declares `r` affine in `u`: one linear solve from the
    /// initial guess replaces the Newton loop.
    pub fn new(problem: &'a P, backend: LinearBackend, config: NewtonConfig, linear: bool) -> Self {
        EquilibriumSolver {
            problem,
            backend,
            config,
            linear,
        }
    }

    pub fn problem(&self) -> &'a P {
        self.problem
    }

    pub fn backend(&self) -> &LinearBackend {
        &self.backend
    }

    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// `Some(||r(u, p)||)` if `(u, p)` is not an equilibrium, `None` if it is.
    ///
    /// The threshold follows the Newton tolerances, scaled by
    /// [`Problem::residual_scale`] instead of the initial residual, so the
    /// check costs a single residual evaluation.
    pub fn equilibrium_defect(&self, u: &[f64], p: &[f64]) -> Option<f64> {
        let res = residual_norm(self.problem, u, p);
        let scale = self.problem.residual_scale(p);
        let threshold = EQUILIBRIUM_SLACK * self.config.abs_tol.max(self.config.rel_tol * scale);
        // NaN residuals fall through to `Some`.
        if res <= threshold {
            None
        } else {
            Some(res)
        }
    }

    /// Return `u` with `r(u, p) ≈ 0`.
    ///
    /// # Errors
    ///
    /// - [`FemError::ShapeMismatch`] if `p` has the wrong length (checked
    ///   before any work).
    /// - [`FemError::PrimalSolve`] if a Newton step's linear system fails.
    /// - [`FemError::NotConverged`] if the iteration cap is reached or the
    ///   residual becomes non-finite.
    pub fn solve(&self, p: &[f64]) -> Result<Vec<f64>, FemError> {
        check_shape("parameter vector", self.problem.num_params(), p.len())?;
        let n = self.problem.num_dofs();
        let mut u = self.problem.initial_guess();
        check_shape("initial guess", n, u.len())?;

        let _span = info_span!("equilibrium_solve", dofs = n, linear = self.linear).entered();

        if self.linear {
            self.newton_step(&mut u, p)?;
            debug!(residual_norm = norm(&self.problem.residual(&u, p)), "linear solve");
            return Ok(u);
        }

        let mut residual_norm = norm(&self.problem.residual(&u, p));
        let initial_norm = residual_norm;
        for iteration in 0..self.config.max_iter {
            debug!(iteration, residual_norm, "newton");
            if !residual_norm.is_finite() {
                return Err(FemError::NotConverged {
                    iterations: iteration,
                    residual_norm,
                });
            }
            if self.config.is_converged(residual_norm, initial_norm) {
                return Ok(u);
            }
            self.newton_step(&mut u, p)?;
            residual_norm = norm(&self.problem.residual(&u, p));
        }

        if residual_norm.is_finite() && self.config.is_converged(residual_norm, initial_norm) {
            debug!(iteration = self.config.max_iter, residual_norm, "newton");
            return Ok(u);
        }
        Err(FemError::NotConverged {
            iterations: self.config.max_iter,
            residual_norm,
        })
    }

    /// `u ← u − J(u, p)⁻¹ r(u, p)`.
    fn newton_step(&self, u: &mut [f64], p: &[f64]) -> Result<(), FemError> {
        let r = self.problem.residual(&*u, p);
        let jac = self.problem.jacobian(&*u, p)?;
        let delta =
            f64::solve_with(&self.backend, &jac, &r, false).map_err(FemError::PrimalSolve)?;
        u.iter_mut().zip(&delta).for_each(|(ui, di)| *ui -= di);
        Ok(())
    }
}
