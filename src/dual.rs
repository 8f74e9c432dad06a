use std::fmt::{self, Display};

use crate::Scalar;

/// Forward-mode dual number: a value paired with its tangent (derivative).
///
/// `Dual { re, eps }` represents `re + eps·ε` where `ε² = 0`. The components
/// are themselves [`Scalar`]s, so duals nest: `Dual<Dual<f64>>` carries mixed
/// second derivatives, and `Reverse<'_, Dual<f64>>` runs a reverse sweep whose
/// adjoints carry a tangent (forward-over-reverse).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dual<T> {
    /// Primal (real) value.
    pub re: T,
    /// Tangent (derivative) value.
    pub eps: T,
}

impl<T: Scalar> Display for Dual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

impl<T: Scalar> Dual<T> {
    /// Create a new dual number.
    #[inline]
    pub fn new(re: T, eps: T) -> Self {
        Dual { re, eps }
    }

    /// Create a constant (zero derivative).
    #[inline]
    pub fn constant(re: T) -> Self {
        Dual { re, eps: T::zero() }
    }

    /// Create a variable (unit derivative) for differentiation.
    #[inline]
    pub fn variable(re: T) -> Self {
        Dual { re, eps: T::one() }
    }

    #[inline]
    pub fn recip(self) -> Self {
        let inv = T::one() / self.re;
        Dual {
            re: inv,
            eps: -(self.eps * inv * inv),
        }
    }

    /// Zip primal values with tangent directions.
    pub fn seed(values: &[T], tangents: &[T]) -> Vec<Self> {
        debug_assert_eq!(values.len(), tangents.len());
        values
            .iter()
            .zip(tangents)
            .map(|(&re, &eps)| Dual { re, eps })
            .collect()
    }

    /// Split a slice of duals into `(primal, tangent)` vectors.
    pub fn unzip(duals: &[Self]) -> (Vec<T>, Vec<T>) {
        duals.iter().map(|d| (d.re, d.eps)).unzip()
    }
}
