use std::fmt::{self, Debug, Display};

use crate::tape::{Tape, CONSTANT};
use crate::Scalar;

/// Reverse-mode AD variable.
///
/// A value, a tape index and a borrow of the tape it was recorded on. `Copy`
/// because the tape is shared, not owned. Constants carry no tape and are
/// never recorded.
#[derive(Clone, Copy)]
pub struct Reverse<'t, T: Scalar> {
    pub(crate) value: T,
    pub(crate) index: u32,
    pub(crate) tape: Option<&'t Tape<T>>,
}

impl<'t, T: Scalar> Reverse<'t, T> {
    /// Create a constant (not tracked on tape).
    #[inline]
    pub fn constant(value: T) -> Self {
        Reverse {
            value,
            index: CONSTANT,
            tape: None,
        }
    }

    /// Register a fresh independent variable on `tape`.
    #[inline]
    pub fn variable(tape: &'t Tape<T>, value: T) -> Self {
        let (index, value) = tape.new_variable(value);
        Reverse {
            value,
            index,
            tape: Some(tape),
        }
    }

    /// Get the tape index ([`CONSTANT`] for untracked values).
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The primal value at the scalar level directly below this one.
    #[inline]
    pub fn primal(&self) -> T {
        self.value
    }

    #[inline]
    pub(crate) fn record_unary(self, value: T, mult: T) -> Self {
        match self.tape {
            Some(tape) => Reverse {
                value,
                index: tape.push_unary(self.index, mult),
                tape: Some(tape),
            },
            None => Reverse::constant(value),
        }
    }

    #[inline]
    pub(crate) fn record_binary(self, rhs: Self, value: T, lhs_mult: T, rhs_mult: T) -> Self {
        debug_assert!(
            match (self.tape, rhs.tape) {
                (Some(a), Some(b)) => std::ptr::eq(a, b),
                _ => true,
            },
            "operands recorded on different tapes"
        );
        match self.tape.or(rhs.tape) {
            Some(tape) => Reverse {
                value,
                index: tape.push_binary(self.index, lhs_mult, rhs.index, rhs_mult),
                tape: Some(tape),
            },
            None => Reverse::constant(value),
        }
    }
}

impl<T: Scalar> Debug for Reverse<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reverse")
            .field("value", &self.value)
            .field("index", &self.index)
            .finish()
    }
}

impl<T: Scalar> Display for Reverse<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: Scalar> Default for Reverse<'_, T> {
    fn default() -> Self {
        Reverse::constant(T::zero())
    }
}
