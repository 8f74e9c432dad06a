//! The linear-solve primitive, lifted to every scalar in the tower.
//!
//! Backends only ever see `f64` matrices ([`LinearSolve`]). [`SolveScalar`]
//! extends a solve to dual numbers with the tangent rule of `x = A⁻¹ b`:
//!
//! ```text
//! A ẋ = ḃ − Ȧ x          (primal solve)
//! Aᵀ ẋ = ḃ − Ȧᵀ x        (transpose solve)
//! ```
//!
//! so a dual solve costs two backend calls on the same primal matrix. Nesting
//! the rule handles `Dual<Dual<f64>>` as well.

use crate::dual::Dual;
use crate::sparse::CsrMatrix;
use crate::Scalar;

/// A sparse linear solver on `f64`.
///
/// Implementations must not assume symmetry: `solve_transpose` is a separate
/// entry point and is exercised by adjoint computations.
pub trait LinearSolve {
    type Error;

    /// Short identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Solve `A x = b`.
    fn solve(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, Self::Error>;

    /// Solve `Aᵀ x = b`.
    fn solve_transpose(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, Self::Error>;
}

impl<L: LinearSolve + ?Sized> LinearSolve for &L {
    type Error = L::Error;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, Self::Error> {
        (**self).solve(a, b)
    }

    fn solve_transpose(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, Self::Error> {
        (**self).solve_transpose(a, b)
    }
}

/// Scalars whose linear systems can be solved by an `f64` backend.
pub trait SolveScalar: Scalar<Float = f64> + 'static {
    /// Solve `A x = b`, or `Aᵀ x = b` when `transpose` is set.
    fn solve_with<L: LinearSolve + ?Sized>(
        solver: &L,
        a: &CsrMatrix<Self>,
        b: &[Self],
        transpose: bool,
    ) -> Result<Vec<Self>, L::Error>;
}

impl SolveScalar for f64 {
    fn solve_with<L: LinearSolve + ?Sized>(
        solver: &L,
        a: &CsrMatrix<f64>,
        b: &[f64],
        transpose: bool,
    ) -> Result<Vec<f64>, L::Error> {
        if transpose {
            solver.solve_transpose(a, b)
        } else {
            solver.solve(a, b)
        }
    }
}

impl<T: SolveScalar> SolveScalar for Dual<T> {
    fn solve_with<L: LinearSolve + ?Sized>(
        solver: &L,
        a: &CsrMatrix<Self>,
        b: &[Self],
        transpose: bool,
    ) -> Result<Vec<Self>, L::Error> {
        let a_re = a.map(|d| d.re);
        let a_eps = a.map(|d| d.eps);
        let (b_re, b_eps) = Dual::unzip(b);

        let x_re = T::solve_with(solver, &a_re, &b_re, transpose)?;

        let a_dot_x = if transpose {
            a_eps.transpose_matvec(&x_re)
        } else {
            a_eps.matvec(&x_re)
        };
        let rhs: Vec<T> = b_eps.iter().zip(&a_dot_x).map(|(&bd, &ax)| bd - ax).collect();
        let x_eps = T::solve_with(solver, &a_re, &rhs, transpose)?;

        Ok(Dual::seed(&x_re, &x_eps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cramer's rule on 2×2 systems.
    struct Cramer;

    impl LinearSolve for Cramer {
        type Error = ();

        fn name(&self) -> &'static str {
            "cramer"
        }

        fn solve(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, ()> {
            let g = |i, j| a.get(i, j).unwrap_or(0.0);
            let det = g(0, 0) * g(1, 1) - g(0, 1) * g(1, 0);
            if det == 0.0 {
                return Err(());
            }
            Ok(vec![
                (b[0] * g(1, 1) - g(0, 1) * b[1]) / det,
                (g(0, 0) * b[1] - b[0] * g(1, 0)) / det,
            ])
        }

        fn solve_transpose(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, ()> {
            self.solve(&a.transpose(), b)
        }
    }

    #[test]
    fn dual_solve_matches_derivative_of_inverse() {
        // A(t) = [[2 + t, 1], [0, 3]], b = [1, 1]; x(t) = A(t)⁻¹ b.
        let x_at = |t: f64| {
            let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.0 + t), (0, 1, 1.0), (1, 1, 3.0)])
                .unwrap();
            Cramer.solve(&a, &[1.0, 1.0]).unwrap()
        };
        let a = CsrMatrix::from_triplets(
            2,
            2,
            &[
                (0, 0, Dual::new(2.0, 1.0)),
                (0, 1, Dual::constant(1.0)),
                (1, 1, Dual::constant(3.0)),
            ],
        )
        .unwrap();
        let b = [Dual::constant(1.0), Dual::constant(1.0)];
        let x = Dual::solve_with(&Cramer, &a, &b, false).unwrap();

        let h = 1e-6;
        let (xp, xm) = (x_at(h), x_at(-h));
        for i in 0..2 {
            assert!((x[i].re - x_at(0.0)[i]).abs() < 1e-14);
            assert!((x[i].eps - (xp[i] - xm[i]) / (2.0 * h)).abs() < 1e-8);
        }
    }

    #[test]
    fn dual_transpose_solve_uses_transposed_tangent() {
        let a = CsrMatrix::from_triplets(
            2,
            2,
            &[
                (0, 0, Dual::new(2.0, 0.0)),
                (0, 1, Dual::new(1.0, 1.0)),
                (1, 1, Dual::new(3.0, 0.0)),
            ],
        )
        .unwrap();
        let b = [Dual::new(1.0, 0.0), Dual::new(1.0, 0.0)];
        let xt = Dual::solve_with(&Cramer, &a, &b, true).unwrap();
        let at = a.transpose();
        let x = Dual::solve_with(&Cramer, &at, &b, false).unwrap();
        for i in 0..2 {
            assert!((xt[i].re - x[i].re).abs() < 1e-14);
            assert!((xt[i].eps - x[i].eps).abs() < 1e-14);
        }
    }
}
