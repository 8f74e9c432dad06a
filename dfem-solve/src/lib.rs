//! Differentiable equilibrium solves for finite-element design problems.
//!
//! Given design parameters `p`, [`EquilibriumSolver`] finds `u(p)` with
//! `r(u, p) = 0`. Two wrappers make that solve differentiable without
//! differentiating its iterations:
//!
//! - [`ad_wrapper`] → [`AdjointWrapper`], a hand-written adjoint rule.
//! - [`ad_wrapper_jvp`] → [`TangentWrapper`], a tangent rule whose reverse
//!   mode is derived by transposition, which also yields Hessian-vector
//!   products.
//!
//! Derivatives are taken with the transforms in [`dfem::custom`] or through
//! [`ReducedObjective`]. Linear systems go to a [`LinearBackend`] chosen at
//! construction.
//!
//! ```no_run
//! use dfem_solve::{ad_wrapper_jvp, fe, FieldSum, ReducedObjective};
//!
//! let problem = fe::cantilever(20, 10, 20.0, 10.0)?;
//! let wrapper = ad_wrapper_jvp(&problem, true, false)?;
//! let mut reduced = ReducedObjective::new(&wrapper, FieldSum);
//! let p = vec![0.5; 200];
//! let (value, grad) = reduced.eval_grad(&p)?;
//! let (_, hv) = reduced.hvp(&p, &grad)?;
//! # let _ = (value, hv);
//! # Ok::<(), dfem_solve::FemError>(())
//! ```

pub mod backend;
pub mod convergence;
pub mod error;
pub mod fe;
pub mod implicit;
pub mod newton;
pub mod objective;
pub mod problem;

pub use backend::{LinearBackend, NativeLu};
#[cfg(feature = "parallel")]
pub use backend::ParallelGmres;
pub use convergence::{KrylovConfig, NewtonConfig};
pub use error::{FemError, LinearSolveError};
pub use implicit::{
    ad_wrapper, ad_wrapper_jvp, AdjointWrapper, ParamJacobian, SolveMap, SolverOptions,
    TangentWrapper,
};
pub use newton::EquilibriumSolver;
pub use objective::{Compliance, FieldSum, Objective, ReducedObjective, TargetMismatch};
pub use problem::{param_jvp, param_vjp, residual_norm, Problem};
