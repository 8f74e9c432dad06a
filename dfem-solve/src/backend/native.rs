//! Sparse direct solver on top of faer's LU with partial pivoting.

use std::panic::{catch_unwind, AssertUnwindSafe};

use dfem::{CsrMatrix, LinearSolve};
use faer::linalg::solvers::Solve;
use faer::sparse::{SparseColMat, Triplet};
use faer::Col;
use tracing::trace;

use super::{check_system, verified};
use crate::error::LinearSolveError;

/// Direct sparse LU. Each call factors the matrix afresh, so the solver holds
/// no state and the transpose solve reuses the same factorization path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLu;

impl NativeLu {
    pub const NAME: &'static str = "native-lu";

    fn factor_and_solve(
        &self,
        a: &CsrMatrix<f64>,
        b: &[f64],
        transpose: bool,
    ) -> Result<Vec<f64>, LinearSolveError> {
        check_system(Self::NAME, a, b)?;
        let n = a.nrows();
        if n == 0 {
            return Ok(Vec::new());
        }

        let triplets: Vec<Triplet<usize, usize, f64>> = a
            .triplets()
            .map(|(i, j, v)| Triplet::new(i, j, v))
            .collect();
        let mat = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets).map_err(
            |e| LinearSolveError::Assembly {
                backend: Self::NAME,
                reason: format!("{e:?}"),
            },
        )?;

        // faer's sparse LU can panic on structurally singular input instead
        // of returning an error.
        let lu = catch_unwind(AssertUnwindSafe(|| mat.sp_lu()))
            .map_err(|_| LinearSolveError::Singular {
                backend: Self::NAME,
                reason: "factorization aborted".into(),
            })?
            .map_err(|e| LinearSolveError::Singular {
                backend: Self::NAME,
                reason: e.to_string(),
            })?;

        let rhs = Col::<f64>::from_fn(n, |i| b[i]);
        let sol = if transpose {
            lu.solve_transpose(&rhs)
        } else {
            lu.solve(&rhs)
        };
        let x: Vec<f64> = (0..n).map(|i| sol[i]).collect();
        trace!(n, nnz = a.nnz(), transpose, "sparse LU solve");

        verified(Self::NAME, a, x, b, transpose)
    }
}

impl LinearSolve for NativeLu {
    type Error = LinearSolveError;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn solve(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, LinearSolveError> {
        self.factor_and_solve(a, b, false)
    }

    fn solve_transpose(
        &self,
        a: &CsrMatrix<f64>,
        b: &[f64],
    ) -> Result<Vec<f64>, LinearSolveError> {
        self.factor_and_solve(a, b, true)
    }
}
