//! Differentiable wrappers around the equilibrium solve.
//!
//! Both wrappers compute `u(p)` with [`EquilibriumSolver`] and never
//! differentiate the Newton iterations. Their rules come from differentiating
//! the equilibrium condition `r(u(p), p) = 0` (implicit function theorem):
//!
//! ```text
//! tangent:    J u̇ = −(∂r/∂p) ṗ
//! cotangent:  Jᵀ λ = ū,   p̄ = −(∂r/∂p)ᵀ λ
//! ```
//!
//! - [`AdjointWrapper`] hand-writes the cotangent rule and registers no
//!   tangent rule.
//! - [`TangentWrapper`] registers only the linearization; its cotangent rule is
//!   the transpose the differentiation core derives from it, and its
//!   Hessian-vector products come from running that rule on dual numbers.

use dfem::custom::Linearization;
use dfem::{CsrMatrix, DifferentiableOp, LinearMap, LinearSolve, Scalar, SolveScalar};
use tracing::{debug, info_span, warn};

use crate::backend::LinearBackend;
use crate::convergence::{KrylovConfig, NewtonConfig};
use crate::error::{check_shape, FemError};
use crate::newton::EquilibriumSolver;
use crate::problem::{param_jvp, param_vjp, Problem};

/// Construction-time configuration shared by both wrappers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions {
    /// The residual is affine in `u`: one linear solve, no Newton loop.
    pub linear: bool,
    /// Use the parallel iterative backend instead of the native direct one.
    pub use_parallel: bool,
    pub newton: NewtonConfig,
    pub krylov: KrylovConfig,
}

impl SolverOptions {
    pub fn new(linear: bool, use_parallel: bool) -> Self {
        SolverOptions {
            linear,
            use_parallel,
            ..SolverOptions::default()
        }
    }

    fn build<P: Problem>(self, problem: &P) -> Result<EquilibriumSolver<'_, P>, FemError> {
        let backend = LinearBackend::select(self.use_parallel, self.krylov)?;
        Ok(EquilibriumSolver::new(problem, backend, self.newton, self.linear))
    }
}

/// Reverse-mode wrapper: the solve with a hand-written adjoint rule.
pub fn ad_wrapper<P: Problem>(
    problem: &P,
    linear: bool,
    use_parallel: bool,
) -> Result<AdjointWrapper<'_, P>, FemError> {
    AdjointWrapper::with_options(problem, SolverOptions::new(linear, use_parallel))
}

/// Forward-mode wrapper: the solve with a tangent rule, reverse mode by
/// transposition.
pub fn ad_wrapper_jvp<P: Problem>(
    problem: &P,
    linear: bool,
    use_parallel: bool,
) -> Result<TangentWrapper<'_, P>, FemError> {
    TangentWrapper::with_options(problem, SolverOptions::new(linear, use_parallel))
}

fn check_state<P: Problem, T>(problem: &P, u: &[T], p: &[T]) -> Result<(), FemError> {
    check_shape("solution vector", problem.num_dofs(), u.len())?;
    check_shape("parameter vector", problem.num_params(), p.len())
}

/// Warn when a rule is asked to differentiate at a point that is not an
/// equilibrium: the implicit-function rules are only exact at `r(u, p) = 0`.
fn warn_off_equilibrium<P: Problem, T: SolveScalar>(solver: &EquilibriumSolver<'_, P>, u: &[T], p: &[T]) {
    let u0: Vec<f64> = u.iter().map(Scalar::value).collect();
    let p0: Vec<f64> = p.iter().map(Scalar::value).collect();
    if let Some(res) = solver.equilibrium_defect(&u0, &p0) {
        warn!(residual_norm = res, "differentiating away from equilibrium");
    }
}

// ══════════════════════════════════════════════
//  Reverse-mode wrapper
// ══════════════════════════════════════════════

/// Equilibrium solve with a hand-written cotangent rule.
///
/// One transpose solve per cotangent, whatever the number of parameters.
/// Forward-mode transforms (`jvp`, `hvp`) are rejected with
/// [`dfem::DiffError::MissingRule`].
#[derive(Debug)]
pub struct AdjointWrapper<'a, P> {
    solver: EquilibriumSolver<'a, P>,
}

impl<'a, P: Problem> AdjointWrapper<'a, P> {
    pub fn with_options(problem: &'a P, options: SolverOptions) -> Result<Self, FemError> {
        Ok(AdjointWrapper {
            solver: options.build(problem)?,
        })
    }

    pub fn solver(&self) -> &EquilibriumSolver<'a, P> {
        &self.solver
    }

    /// `λ` with `J(u, p)ᵀ λ = ū`.
    pub fn adjoint_vector<T: SolveScalar>(
        &self,
        u: &[T],
        p: &[T],
        u_bar: &[T],
    ) -> Result<Vec<T>, FemError> {
        let problem = self.solver.problem();
        check_state(problem, u, p)?;
        check_shape("solution cotangent", problem.num_dofs(), u_bar.len())?;
        let jac = problem.jacobian(u, p)?;
        T::solve_with(self.solver.backend(), &jac, u_bar, true).map_err(FemError::Sensitivity)
    }
}

impl<P: Problem> DifferentiableOp for AdjointWrapper<'_, P> {
    type Error = FemError;

    fn name(&self) -> &'static str {
        "ad_wrapper"
    }

    fn input_dim(&self) -> usize {
        self.solver.problem().num_params()
    }

    fn output_dim(&self) -> usize {
        self.solver.problem().num_dofs()
    }

    fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, FemError> {
        self.solver.solve(p)
    }

    fn cotangent_rule<T: SolveScalar>(
        &self,
        u: &[T],
        p: &[T],
        u_bar: &[T],
    ) -> Result<Vec<T>, FemError> {
        let _span = info_span!("adjoint_rule", backend = self.solver.backend().name()).entered();
        warn_off_equilibrium(&self.solver, u, p);

        let lambda = self.adjoint_vector(u, p, u_bar)?;
        let mut p_bar = param_vjp(self.solver.problem(), u, p, &lambda);
        p_bar.iter_mut().for_each(|g| *g = -*g);
        debug!(params = p_bar.len(), "adjoint cotangent");
        Ok(p_bar)
    }
}

// ══════════════════════════════════════════════
//  Forward-mode wrapper
// ══════════════════════════════════════════════

/// Equilibrium solve with a registered linearization only.
#[derive(Debug)]
pub struct TangentWrapper<'a, P> {
    solver: EquilibriumSolver<'a, P>,
}

impl<'a, P: Problem> TangentWrapper<'a, P> {
    pub fn with_options(problem: &'a P, options: SolverOptions) -> Result<Self, FemError> {
        Ok(TangentWrapper {
            solver: options.build(problem)?,
        })
    }

    pub fn solver(&self) -> &EquilibriumSolver<'a, P> {
        &self.solver
    }

    /// `J(u, p)` as a linear map whose application is a solve: `apply` is
    /// `J⁻¹`, `apply_transpose` is `J⁻ᵀ`.
    pub fn sensitivity_operator<T: SolveScalar>(
        &self,
        u: &[T],
        p: &[T],
    ) -> Result<SolveMap<'_, T>, FemError> {
        let problem = self.solver.problem();
        check_state(problem, u, p)?;
        Ok(SolveMap {
            matrix: problem.jacobian(u, p)?,
            backend: self.solver.backend(),
        })
    }
}

impl<P: Problem> DifferentiableOp for TangentWrapper<'_, P> {
    type Error = FemError;

    fn name(&self) -> &'static str {
        "ad_wrapper_jvp"
    }

    fn input_dim(&self) -> usize {
        self.solver.problem().num_params()
    }

    fn output_dim(&self) -> usize {
        self.solver.problem().num_dofs()
    }

    fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, FemError> {
        self.solver.solve(p)
    }

    /// `ṗ ↦ J⁻¹ (−(∂r/∂p) ṗ)`, built from primitives that know their
    /// transposes.
    fn linearize<'b, T: SolveScalar>(
        &'b self,
        u: &[T],
        p: &[T],
    ) -> Result<Linearization<'b, T, FemError>, FemError> {
        warn_off_equilibrium(&self.solver, u, p);
        let solve = self.sensitivity_operator(u, p)?;
        let param = ParamJacobian {
            problem: self.solver.problem(),
            u: u.to_vec(),
            p: p.to_vec(),
        };
        Ok(Box::new(param.scaled(-T::one()).then(solve)))
    }
}

// ══════════════════════════════════════════════
//  Primitive linear maps
// ══════════════════════════════════════════════

/// `∂r/∂p` at a fixed `(u, p)`: forward mode one way, reverse mode the other.
#[derive(Debug)]
pub struct ParamJacobian<'a, P, T> {
    problem: &'a P,
    u: Vec<T>,
    p: Vec<T>,
}

impl<'a, P: Problem, T: SolveScalar> ParamJacobian<'a, P, T> {
    pub fn new(problem: &'a P, u: &[T], p: &[T]) -> Result<Self, FemError> {
        check_state(problem, u, p)?;
        Ok(ParamJacobian {
            problem,
            u: u.to_vec(),
            p: p.to_vec(),
        })
    }
}

impl<P: Problem, T: SolveScalar> LinearMap<T> for ParamJacobian<'_, P, T> {
    type Error = FemError;

    fn input_dim(&self) -> usize {
        self.p.len()
    }

    fn output_dim(&self) -> usize {
        self.u.len()
    }

    fn apply(&self, p_dot: &[T]) -> Result<Vec<T>, FemError> {
        check_shape("parameter tangent", self.p.len(), p_dot.len())?;
        Ok(param_jvp(self.problem, &self.u, &self.p, p_dot))
    }

    fn apply_transpose(&self, lambda: &[T]) -> Result<Vec<T>, FemError> {
        check_shape("residual cotangent", self.u.len(), lambda.len())?;
        Ok(param_vjp(self.problem, &self.u, &self.p, lambda))
    }
}

/// A linear solve with `J`, seen as the linear map `J⁻¹`.
#[derive(Debug)]
pub struct SolveMap<'a, T> {
    matrix: CsrMatrix<T>,
    backend: &'a LinearBackend,
}

impl<T: SolveScalar> SolveMap<'_, T> {
    pub fn matrix(&self) -> &CsrMatrix<T> {
        &self.matrix
    }
}

impl<T: SolveScalar> LinearMap<T> for SolveMap<'_, T> {
    type Error = FemError;

    fn input_dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn output_dim(&self) -> usize {
        self.matrix.ncols()
    }

    fn apply(&self, b: &[T]) -> Result<Vec<T>, FemError> {
        check_shape("solve right-hand side", self.matrix.nrows(), b.len())?;
        T::solve_with(self.backend, &self.matrix, b, false).map_err(FemError::Sensitivity)
    }

    fn apply_transpose(&self, b: &[T]) -> Result<Vec<T>, FemError> {
        check_shape("transpose solve right-hand side", self.matrix.ncols(), b.len())?;
        T::solve_with(self.backend, &self.matrix, b, true).map_err(FemError::Sensitivity)
    }
}
