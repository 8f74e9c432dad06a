use dfem::{custom, DifferentiableOp, Scalar};

use crate::error::{check_shape, FemError};

/// Scalar functional of the solution field, written once for every scalar
/// type so it can be differentiated in any mode.
pub trait Objective {
    fn value<S: Scalar>(&self, u: &[S]) -> S;
}

/// `Σ uᵢ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSum;

impl Objective for FieldSum {
    fn value<S: Scalar>(&self, u: &[S]) -> S {
        u.iter().fold(S::zero(), |acc, &ui| acc + ui)
    }
}

/// External work `fᵀu` (compliance when `f` is the applied load).
#[derive(Debug, Clone)]
pub struct Compliance {
    load: Vec<f64>,
}

impl Compliance {
    pub fn new(load: Vec<f64>) -> Self {
        Compliance { load }
    }
}

impl Objective for Compliance {
    fn value<S: Scalar>(&self, u: &[S]) -> S {
        debug_assert_eq!(u.len(), self.load.len());
        u.iter()
            .zip(&self.load)
            .fold(S::zero(), |acc, (&ui, &fi)| acc + S::from_f64(fi) * ui)
    }
}

/// `½ w ||u − target||²`.
#[derive(Debug, Clone)]
pub struct TargetMismatch {
    target: Vec<f64>,
    weight: f64,
}

impl TargetMismatch {
    pub fn new(target: Vec<f64>, weight: f64) -> Self {
        TargetMismatch { target, weight }
    }
}

impl Objective for TargetMismatch {
    fn value<S: Scalar>(&self, u: &[S]) -> S {
        debug_assert_eq!(u.len(), self.target.len());
        let sq = u.iter().zip(&self.target).fold(S::zero(), |acc, (&ui, &ti)| {
            let d = ui - S::from_f64(ti);
            acc + d * d
        });
        S::from_f64(0.5 * self.weight) * sq
    }
}

/// The reduced objective `p ↦ J(u(p))` for a differentiable solve `u(p)`.
///
/// Counts primal solves so callers can check that a gradient costs one
/// solve plus one adjoint.
pub struct ReducedObjective<'a, W, O> {
    op: &'a W,
    objective: O,
    func_evals: usize,
}

impl<'a, W, O> ReducedObjective<'a, W, O>
where
    W: DifferentiableOp<Error = FemError>,
    O: Objective,
{
    pub fn new(op: &'a W, objective: O) -> Self {
        ReducedObjective {
            op,
            objective,
            func_evals: 0,
        }
    }

    /// Number of parameters.
    pub fn dim(&self) -> usize {
        self.op.input_dim()
    }

    /// Number of primal solves performed so far.
    pub fn func_evals(&self) -> usize {
        self.func_evals
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    /// `J(u(p))`.
    pub fn value(&mut self, p: &[f64]) -> Result<f64, FemError> {
        check_shape("parameter vector", self.dim(), p.len())?;
        self.func_evals += 1;
        let u = self.op.evaluate(p)?;
        Ok(self.objective.value(&u))
    }

    /// `(J, ∇_p J)`.
    pub fn eval_grad(&mut self, p: &[f64]) -> Result<(f64, Vec<f64>), FemError> {
        self.func_evals += 1;
        let objective = &self.objective;
        custom::value_and_grad(self.op, |u| objective.value(u), p)
    }

    /// `(∇_p J, ∇²_p J · v)` by forward-over-reverse.
    pub fn hvp(&mut self, p: &[f64], v: &[f64]) -> Result<(Vec<f64>, Vec<f64>), FemError> {
        self.func_evals += 1;
        let objective = &self.objective;
        custom::hvp(self.op, |u| objective.value(u), p, v)
    }
}
