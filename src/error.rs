use std::fmt;

use thiserror::Error;

/// Which direction of a derivative rule was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    /// Tangent (JVP) rule.
    Forward,
    /// Cotangent (VJP) rule.
    Reverse,
}

impl fmt::Display for RuleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleMode::Forward => write!(f, "forward"),
            RuleMode::Reverse => write!(f, "reverse"),
        }
    }
}

/// Errors raised by the differentiation core itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A transform needs a rule the operation does not register.
    #[error("operation `{op}` registers no {mode}-mode derivative rule")]
    MissingRule { op: &'static str, mode: RuleMode },

    /// A vector handed to a transform or linear map has the wrong length.
    #[error("dimension mismatch for {what}: expected {expected}, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A sparse entry lies outside the matrix.
    #[error("entry ({row}, {col}) is outside a {nrows}x{ncols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },
}

/// Return [`DiffError::DimensionMismatch`] unless `found == expected`.
#[inline]
pub fn check_dim(what: &'static str, expected: usize, found: usize) -> Result<(), DiffError> {
    if expected == found {
        Ok(())
    } else {
        Err(DiffError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}
