use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::dual::Dual;
use crate::reverse::Reverse;
use crate::Scalar;

// ──────────────────────────────────────────────
//  Dual<T>: (a + a'ε) ∘ (b + b'ε)
// ──────────────────────────────────────────────

macro_rules! impl_dual_binary {
    ($trait:ident, $method:ident, |$a:ident, $b:ident| $re:expr, $eps:expr) => {
        impl<T: Scalar> $trait for Dual<T> {
            type Output = Self;
            #[inline]
            fn $method(self, rhs: Self) -> Self {
                let ($a, $b) = (self, rhs);
                Dual { re: $re, eps: $eps }
            }
        }
    };
}

impl_dual_binary!(Add, add, |a, b| a.re + b.re, a.eps + b.eps);
impl_dual_binary!(Sub, sub, |a, b| a.re - b.re, a.eps - b.eps);
impl_dual_binary!(Mul, mul, |a, b| a.re * b.re, a.re * b.eps + a.eps * b.re);

impl<T: Scalar> Div for Dual<T> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = T::one() / rhs.re;
        let re = self.re * inv;
        // (a/b)' = (a' − (a/b) b') / b
        Dual {
            re,
            eps: (self.eps - re * rhs.eps) * inv,
        }
    }
}

impl<T: Scalar> Neg for Dual<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Dual::new(-self.re, -self.eps)
    }
}

// ──────────────────────────────────────────────
//  Reverse<T>: value plus the two local partials
// ──────────────────────────────────────────────

macro_rules! impl_reverse_binary {
    ($trait:ident, $method:ident, |$a:ident, $b:ident| $value:expr, $da:expr, $db:expr) => {
        impl<T: Scalar> $trait for Reverse<'_, T> {
            type Output = Self;
            #[inline]
            fn $method(self, rhs: Self) -> Self {
                let ($a, $b) = (self.value, rhs.value);
                self.record_binary(rhs, $value, $da, $db)
            }
        }
    };
}

impl_reverse_binary!(Add, add, |a, b| a + b, T::one(), T::one());
impl_reverse_binary!(Sub, sub, |a, b| a - b, T::one(), -T::one());
impl_reverse_binary!(Mul, mul, |a, b| a * b, b, a);

impl<T: Scalar> Div for Reverse<'_, T> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = T::one() / rhs.value;
        let value = self.value * inv;
        self.record_binary(rhs, value, inv, -(value * inv))
    }
}

impl<T: Scalar> Neg for Reverse<'_, T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.record_unary(-self.value, -T::one())
    }
}

// ──────────────────────────────────────────────
//  Compound assignment, shared by both modes
// ──────────────────────────────────────────────

macro_rules! impl_assign_ops {
    ($ty:ty) => {
        impl_assign_ops!(@one $ty, AddAssign, add_assign, +);
        impl_assign_ops!(@one $ty, SubAssign, sub_assign, -);
        impl_assign_ops!(@one $ty, MulAssign, mul_assign, *);
        impl_assign_ops!(@one $ty, DivAssign, div_assign, /);
    };
    (@one $ty:ty, $trait:ident, $method:ident, $op:tt) => {
        impl<T: Scalar> $trait for $ty {
            #[inline]
            fn $method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_assign_ops!(Dual<T>);
impl_assign_ops!(Reverse<'_, T>);
