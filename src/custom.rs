//! Custom derivative rules for opaque operations.
//!
//! An equilibrium solve `p ↦ u(p)` must not be differentiated through its
//! iterations. Instead it implements [`DifferentiableOp`]: a primal
//! [`evaluate`](DifferentiableOp::evaluate) plus rules expressed at an
//! already-computed solution `u`. The transforms in this module ([`jvp`],
//! [`vjp`], [`value_and_grad`], [`hvp`]) only ever call those rules.
//!
//! An operation can register
//! - a linearization (a [`LinearMap`] for `ṗ ↦ u̇`), from which both the
//!   tangent rule and, by transposition, the cotangent rule follow, or
//! - hand-written tangent and/or cotangent rules.
//!
//! Rules are generic over [`SolveScalar`], so the same rule runs on `f64` for
//! first derivatives and on [`Dual`] scalars when [`hvp`] differentiates the
//! cotangent rule once more.

use crate::api;
use crate::dual::Dual;
use crate::error::{check_dim, DiffError, RuleMode};
use crate::linear::LinearMap;
use crate::reverse::Reverse;
use crate::solve::SolveScalar;

/// Boxed tangent map returned by [`DifferentiableOp::linearize`].
pub type Linearization<'a, T, E> = Box<dyn LinearMap<T, Error = E> + 'a>;

/// An operation `R^n → R^m` with user-supplied derivative rules.
pub trait DifferentiableOp {
    /// Error type of the primal and of every rule.
    type Error: From<DiffError>;

    /// Name reported in [`DiffError::MissingRule`].
    fn name(&self) -> &'static str;

    /// Number of parameters `n`.
    fn input_dim(&self) -> usize;

    /// Length `m` of the solution.
    fn output_dim(&self) -> usize;

    /// The primal computation `u = op(p)`.
    fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, Self::Error>;

    /// The tangent map `ṗ ↦ u̇` at the solution `u` of parameters `p`.
    fn linearize<'a, T: SolveScalar>(
        &'a self,
        u: &[T],
        p: &[T],
    ) -> Result<Linearization<'a, T, Self::Error>, Self::Error> {
        let _ = (u, p);
        Err(DiffError::MissingRule {
            op: self.name(),
            mode: RuleMode::Forward,
        }
        .into())
    }

    /// `u̇ = (du/dp) ṗ`. Defaults to applying [`linearize`](Self::linearize).
    fn tangent_rule<T: SolveScalar>(
        &self,
        u: &[T],
        p: &[T],
        p_dot: &[T],
    ) -> Result<Vec<T>, Self::Error> {
        self.linearize(u, p)?.apply(p_dot)
    }

    /// `p̄ = (du/dp)ᵀ ū`. Defaults to the transpose of
    /// [`linearize`](Self::linearize).
    fn cotangent_rule<T: SolveScalar>(
        &self,
        u: &[T],
        p: &[T],
        u_bar: &[T],
    ) -> Result<Vec<T>, Self::Error> {
        self.linearize(u, p)?.transposed().apply(u_bar)
    }
}

fn check_params<O: DifferentiableOp>(op: &O, p: &[f64]) -> Result<(), O::Error> {
    check_dim("parameter vector", op.input_dim(), p.len())?;
    Ok(())
}

/// Forward mode through `op`: returns `(u, u̇)`.
pub fn jvp<O: DifferentiableOp>(
    op: &O,
    p: &[f64],
    p_dot: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), O::Error> {
    check_params(op, p)?;
    check_dim("parameter tangent", op.input_dim(), p_dot.len())?;
    let u = op.evaluate(p)?;
    let u_dot = op.tangent_rule(&u, p, p_dot)?;
    Ok((u, u_dot))
}

/// Reverse mode through `op`: returns `(u, p̄)`.
pub fn vjp<O: DifferentiableOp>(
    op: &O,
    p: &[f64],
    u_bar: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), O::Error> {
    check_params(op, p)?;
    check_dim("solution cotangent", op.output_dim(), u_bar.len())?;
    let u = op.evaluate(p)?;
    let p_bar = op.cotangent_rule(&u, p, u_bar)?;
    Ok((u, p_bar))
}

/// Value and gradient of `f(op(p))` for a scalar objective `f` of the
/// solution. One primal evaluation, one reverse sweep of `f`, one cotangent
/// rule.
pub fn value_and_grad<O: DifferentiableOp>(
    op: &O,
    f: impl for<'t> FnOnce(&[Reverse<'t, f64>]) -> Reverse<'t, f64>,
    p: &[f64],
) -> Result<(f64, Vec<f64>), O::Error> {
    check_params(op, p)?;
    let u = op.evaluate(p)?;
    let (value, u_bar) = api::value_and_grad(f, &u);
    let p_bar = op.cotangent_rule(&u, p, &u_bar)?;
    Ok((value, p_bar))
}

/// Hessian-vector product of `f(op(p))` by forward-over-reverse.
///
/// The tangent rule gives `u̇` along `v`; the objective gradient is then taken
/// at `Dual(u, u̇)` and the cotangent rule is evaluated on dual scalars, so the
/// tangent part of its output is `H v`. Returns `(∇, H v)`.
pub fn hvp<O: DifferentiableOp>(
    op: &O,
    f: impl for<'t> FnOnce(&[Reverse<'t, Dual<f64>>]) -> Reverse<'t, Dual<f64>>,
    p: &[f64],
    v: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), O::Error> {
    check_params(op, p)?;
    check_dim("direction", op.input_dim(), v.len())?;
    let u = op.evaluate(p)?;
    let u_dot = op.tangent_rule(&u, p, v)?;

    let u_dual = Dual::seed(&u, &u_dot);
    let p_dual = Dual::seed(p, v);
    let (_, u_bar) = api::value_and_grad(f, &u_dual);
    let p_bar = op.cotangent_rule(&u_dual, &p_dual, &u_bar)?;
    Ok(Dual::unzip(&p_bar))
}
