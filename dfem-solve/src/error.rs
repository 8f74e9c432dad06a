use dfem::DiffError;
use thiserror::Error;

/// Failure of a single linear solve, tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinearSolveError {
    /// The factorization or the Krylov process hit an exactly singular system.
    #[error("{backend}: singular system ({reason})")]
    Singular {
        backend: &'static str,
        reason: String,
    },

    /// The iterative solver ran out of iterations.
    #[error(
        "{backend}: no convergence after {iterations} iterations \
         (relative residual {relative_residual:.3e})"
    )]
    Stalled {
        backend: &'static str,
        iterations: usize,
        relative_residual: f64,
    },

    /// The computed solution does not satisfy the system (NaN, infinity or a
    /// backward error far above round-off).
    #[error("{backend}: unreliable solution (backward error {backward_error:.3e})")]
    Inaccurate {
        backend: &'static str,
        backward_error: f64,
    },

    /// The system could not be handed to the backend at all.
    #[error("{backend}: {reason}")]
    Assembly {
        backend: &'static str,
        reason: String,
    },
}

impl LinearSolveError {
    /// Name of the backend that failed.
    pub fn backend(&self) -> &'static str {
        match self {
            LinearSolveError::Singular { backend, .. }
            | LinearSolveError::Stalled { backend, .. }
            | LinearSolveError::Inaccurate { backend, .. }
            | LinearSolveError::Assembly { backend, .. } => backend,
        }
    }
}

/// Errors of the equilibrium solver and the differentiable wrappers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FemError {
    /// An input vector has the wrong length. Raised before any solve.
    #[error("shape mismatch for {what}: expected {expected}, got {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// The requested linear backend is not compiled in.
    #[error("linear backend `{backend}` is unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: &'static str,
    },

    /// Newton iteration exhausted its budget or produced a non-finite residual.
    #[error(
        "equilibrium solve did not converge after {iterations} iterations \
         (residual norm {residual_norm:.3e})"
    )]
    NotConverged {
        iterations: usize,
        residual_norm: f64,
    },

    /// A linear solve inside the primal Newton iteration failed.
    #[error("primal linear solve failed: {0}")]
    PrimalSolve(LinearSolveError),

    /// The adjoint or tangent linear solve failed.
    #[error("sensitivity solve failed: {0}")]
    Sensitivity(LinearSolveError),

    /// The problem definition itself is inconsistent.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// Raised by the differentiation core (e.g. a missing derivative rule).
    #[error(transparent)]
    Diff(DiffError),
}

impl From<DiffError> for FemError {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::DimensionMismatch {
                what,
                expected,
                found,
            } => FemError::ShapeMismatch {
                what,
                expected,
                found,
            },
            other => FemError::Diff(other),
        }
    }
}

/// Return [`FemError::ShapeMismatch`] unless `found == expected`.
pub(crate) fn check_shape(what: &'static str, expected: usize, found: usize) -> Result<(), FemError> {
    Ok(dfem::error::check_dim(what, expected, found)?)
}
