//! The [`Scalar`] trait for writing AD-generic numeric code.
//!
//! Residuals, cell kernels and objectives are written once as
//! `fn f<S: Scalar>(x: &[S]) -> S` and then evaluated on plain `f64`, on
//! [`Dual`] numbers (forward mode), on [`Reverse`] variables (reverse mode),
//! or on nested combinations such as `Reverse<'_, Dual<f64>>` for
//! forward-over-reverse second derivatives.

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{Float as NumFloat, FromPrimitive, One, Zero};

use crate::dual::Dual;
use crate::float::Float;
use crate::reverse::Reverse;

/// The central trait for AD-generic numeric code.
///
/// Only the operations the finite-element residuals need are required:
/// field arithmetic, `sqrt`, integer powers and a finiteness test. Every
/// implementation is branch-free in the derivative part, so nesting modes
/// never introduces NaN where the primal is finite.
pub trait Scalar:
    Copy
    + Default
    + Debug
    + Display
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// The underlying primitive float type.
    type Float: Float;

    /// Lift a plain float to this scalar (constant, zero derivative).
    fn from_f(val: Self::Float) -> Self;

    /// Lift an `f64` literal, converting through the primitive type.
    #[inline]
    fn from_f64(val: f64) -> Self {
        let prim = <Self::Float as FromPrimitive>::from_f64(val)
            .unwrap_or_else(<Self::Float as NumFloat>::nan);
        Self::from_f(prim)
    }

    /// Extract the primal value.
    fn value(&self) -> Self::Float;

    fn sqrt(self) -> Self;

    /// Integer power. The default uses binary exponentiation and is exact for
    /// the derivative parts since it only multiplies.
    #[inline]
    fn powi(self, n: i32) -> Self {
        let mut base = if n < 0 { Self::one() / self } else { self };
        let mut exp = n.unsigned_abs();
        let mut acc = Self::one();
        while exp > 0 {
            if exp & 1 == 1 {
                acc *= base;
            }
            base *= base;
            exp >>= 1;
        }
        acc
    }

    /// `true` when the primal and every derivative component are finite.
    fn is_finite(&self) -> bool;
}

impl Scalar for f32 {
    type Float = f32;

    #[inline]
    fn from_f(val: f32) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f32 {
        *self
    }

    #[inline]
    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f32::powi(self, n)
    }

    #[inline]
    fn is_finite(&self) -> bool {
        f32::is_finite(*self)
    }
}

impl Scalar for f64 {
    type Float = f64;

    #[inline]
    fn from_f(val: f64) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }

    #[inline]
    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl<T: Scalar> Scalar for Dual<T> {
    type Float = T::Float;

    #[inline]
    fn from_f(val: T::Float) -> Self {
        Dual::constant(T::from_f(val))
    }

    #[inline]
    fn value(&self) -> T::Float {
        self.re.value()
    }

    #[inline]
    fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        Dual {
            re: s,
            eps: self.eps / (s + s),
        }
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Dual::constant(T::one());
        }
        let below = self.re.powi(n - 1);
        Dual {
            re: below * self.re,
            eps: T::from_f64(f64::from(n)) * below * self.eps,
        }
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.re.is_finite() && self.eps.is_finite()
    }
}

impl<'t, T: Scalar> Scalar for Reverse<'t, T> {
    type Float = T::Float;

    #[inline]
    fn from_f(val: T::Float) -> Self {
        Reverse::constant(T::from_f(val))
    }

    #[inline]
    fn value(&self) -> T::Float {
        self.value.value()
    }

    #[inline]
    fn sqrt(self) -> Self {
        let s = self.value.sqrt();
        self.record_unary(s, T::one() / (s + s))
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Reverse::constant(T::one());
        }
        let below = self.value.powi(n - 1);
        self.record_unary(below * self.value, T::from_f64(f64::from(n)) * below)
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}
