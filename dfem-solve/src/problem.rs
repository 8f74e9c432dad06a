//! The residual/assembly collaborator consumed by the solver and wrappers.

use dfem::{CsrMatrix, Dual, Reverse, Scalar};

use crate::convergence::norm;
use crate::error::FemError;

/// A parameterized discrete equilibrium `r(u, p) = 0`.
///
/// `residual` and `jacobian` are written once, generic over the scalar type,
/// and must be branch-free in it: the wrappers evaluate them on `f64` for the
/// primal solve, on [`Dual`] numbers for tangents and Hessian-vector
/// products, and on [`Reverse`] variables for parameter cotangents.
pub trait Problem {
    /// Length of `u`.
    fn num_dofs(&self) -> usize;

    /// Length of `p`.
    fn num_params(&self) -> usize;

    /// `r(u, p)`, of length [`num_dofs`](Self::num_dofs).
    fn residual<S: Scalar>(&self, u: &[S], p: &[S]) -> Vec<S>;

    /// `∂r/∂u` at `(u, p)`, square of size [`num_dofs`](Self::num_dofs).
    fn jacobian<S: Scalar>(&self, u: &[S], p: &[S]) -> Result<CsrMatrix<S>, FemError>;

    /// Newton starting point (default: zero).
    fn initial_guess(&self) -> Vec<f64> {
        vec![0.0; self.num_dofs()]
    }

    /// Size of the loading at `p`, the reference for relative equilibrium
    /// checks (default: `||r(u_0, p)||` at the initial guess).
    fn residual_scale(&self, p: &[f64]) -> f64 {
        residual_norm(self, &self.initial_guess(), p)
    }
}

impl<P: Problem + ?Sized> Problem for &P {
    fn num_dofs(&self) -> usize {
        (**self).num_dofs()
    }

    fn num_params(&self) -> usize {
        (**self).num_params()
    }

    fn residual<S: Scalar>(&self, u: &[S], p: &[S]) -> Vec<S> {
        (**self).residual(u, p)
    }

    fn jacobian<S: Scalar>(&self, u: &[S], p: &[S]) -> Result<CsrMatrix<S>, FemError> {
        (**self).jacobian(u, p)
    }

    fn initial_guess(&self) -> Vec<f64> {
        (**self).initial_guess()
    }

    fn residual_scale(&self, p: &[f64]) -> f64 {
        (**self).residual_scale(p)
    }
}

/// `(∂r/∂p) ṗ` by forward mode, `u` held fixed.
pub fn param_jvp<P: Problem + ?Sized, T: Scalar>(
    problem: &P,
    u: &[T],
    p: &[T],
    p_dot: &[T],
) -> Vec<T> {
    let u_const: Vec<Dual<T>> = u.iter().map(|&ui| Dual::constant(ui)).collect();
    let (_, tangent) = dfem::jvp(|p_dual| problem.residual(&u_const, p_dual), p, p_dot);
    tangent
}

/// `(∂r/∂p)ᵀ λ` by reverse mode, `u` held fixed (recorded as constants).
pub fn param_vjp<P: Problem + ?Sized, T: Scalar>(
    problem: &P,
    u: &[T],
    p: &[T],
    lambda: &[T],
) -> Vec<T> {
    let (_, cotangent) = dfem::vjp(
        |p_rev| {
            let u_const: Vec<Reverse<'_, T>> = u.iter().map(|&ui| Reverse::constant(ui)).collect();
            problem.residual(&u_const, p_rev)
        },
        p,
        lambda,
    );
    cotangent
}

/// `||r(u, p)||_2` on plain floats.
pub fn residual_norm<P: Problem + ?Sized>(problem: &P, u: &[f64], p: &[f64]) -> f64 {
    norm(&problem.residual(u, p))
}
