//! Linear solve backends.
//!
//! Two interchangeable implementations of [`dfem::LinearSolve`]:
//!
//! - [`NativeLu`]: sparse direct LU (faer), always available.
//! - [`ParallelGmres`]: restarted GMRES with Jacobi preconditioning whose
//!   kernels run on the rayon pool, available with the `parallel` feature.
//!
//! Neither assumes symmetry. Both verify what they return: a solution with
//! non-finite entries or a backward error far above round-off is reported as
//! an error instead of being handed to the caller.

pub mod native;

#[cfg(feature = "parallel")]
pub mod krylov;

use dfem::{CsrMatrix, LinearSolve};

use crate::convergence::{max_abs, KrylovConfig};
use crate::error::{FemError, LinearSolveError};

#[cfg(feature = "parallel")]
pub use krylov::ParallelGmres;
pub use native::NativeLu;

/// Largest accepted normwise backward error of a returned solution.
pub const BACKWARD_ERROR_TOL: f64 = 1e-8;

/// Backend chosen once, at wrapper construction.
#[derive(Debug, Clone)]
pub enum LinearBackend {
    Native(NativeLu),
    #[cfg(feature = "parallel")]
    Parallel(ParallelGmres),
}

impl LinearBackend {
    /// `false` selects the native direct solver, `true` the parallel
    /// iterative one. Asking for the parallel backend in a build without the
    /// `parallel` feature fails here rather than at the first solve.
    pub fn select(use_parallel: bool, krylov: KrylovConfig) -> Result<Self, FemError> {
        if !use_parallel {
            return Ok(LinearBackend::Native(NativeLu::default()));
        }
        Self::parallel(krylov)
    }

    #[cfg(feature = "parallel")]
    fn parallel(krylov: KrylovConfig) -> Result<Self, FemError> {
        Ok(LinearBackend::Parallel(ParallelGmres::new(krylov)))
    }

    #[cfg(not(feature = "parallel"))]
    fn parallel(_krylov: KrylovConfig) -> Result<Self, FemError> {
        Err(FemError::BackendUnavailable {
            backend: "parallel-gmres",
            reason: "built without the `parallel` feature",
        })
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, LinearBackend::Native(_))
    }
}

impl LinearSolve for LinearBackend {
    type Error = LinearSolveError;

    fn name(&self) -> &'static str {
        match self {
            LinearBackend::Native(s) => s.name(),
            #[cfg(feature = "parallel")]
            LinearBackend::Parallel(s) => s.name(),
        }
    }

    fn solve(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, LinearSolveError> {
        match self {
            LinearBackend::Native(s) => s.solve(a, b),
            #[cfg(feature = "parallel")]
            LinearBackend::Parallel(s) => s.solve(a, b),
        }
    }

    fn solve_transpose(
        &self,
        a: &CsrMatrix<f64>,
        b: &[f64],
    ) -> Result<Vec<f64>, LinearSolveError> {
        match self {
            LinearBackend::Native(s) => s.solve_transpose(a, b),
            #[cfg(feature = "parallel")]
            LinearBackend::Parallel(s) => s.solve_transpose(a, b),
        }
    }
}

// ══════════════════════════════════════════════
//  Shared checks
// ══════════════════════════════════════════════

/// Reject non-square systems and right-hand sides of the wrong length.
pub(crate) fn check_system(
    backend: &'static str,
    a: &CsrMatrix<f64>,
    b: &[f64],
) -> Result<(), LinearSolveError> {
    if a.nrows() != a.ncols() {
        return Err(LinearSolveError::Assembly {
            backend,
            reason: format!("matrix is {}x{}, not square", a.nrows(), a.ncols()),
        });
    }
    if b.len() != a.nrows() {
        return Err(LinearSolveError::Assembly {
            backend,
            reason: format!("right-hand side has length {}, expected {}", b.len(), a.nrows()),
        });
    }
    Ok(())
}

/// `||b - op(A) x||_inf / (||A||_inf ||x||_inf + ||b||_inf)`, where `op` is
/// the transpose when `transpose` is set. Infinite for non-finite `x`.
pub(crate) fn backward_error(a: &CsrMatrix<f64>, x: &[f64], b: &[f64], transpose: bool) -> f64 {
    if x.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }
    let ax = if transpose {
        a.transpose_matvec(x)
    } else {
        a.matvec(x)
    };
    let r: Vec<f64> = b.iter().zip(&ax).map(|(bi, ai)| bi - ai).collect();
    // Row sums of |A| bound ||A||_inf; column sums bound ||A^T||_inf.
    let a_abs = a.map(|v| v.abs());
    let ones = vec![1.0; a.nrows()];
    let a_norm = if transpose {
        max_abs(&a_abs.transpose_matvec(&ones))
    } else {
        max_abs(&a_abs.matvec(&ones))
    };
    let denom = a_norm * max_abs(x) + max_abs(b);
    if denom == 0.0 {
        return 0.0;
    }
    max_abs(&r) / denom
}

/// Pass `x` through if its backward error is acceptable.
pub(crate) fn verified(
    backend: &'static str,
    a: &CsrMatrix<f64>,
    x: Vec<f64>,
    b: &[f64],
    transpose: bool,
) -> Result<Vec<f64>, LinearSolveError> {
    let eta = backward_error(a, &x, b, transpose);
    if eta <= BACKWARD_ERROR_TOL {
        Ok(x)
    } else {
        Err(LinearSolveError::Inaccurate {
            backend,
            backward_error: eta,
        })
    }
}
