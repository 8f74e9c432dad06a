use num_traits::{One, Zero};

use crate::dual::Dual;
use crate::reverse::Reverse;
use crate::Scalar;

impl<T: Scalar> Zero for Dual<T> {
    #[inline]
    fn zero() -> Self {
        Dual::constant(T::zero())
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.re.is_zero() && self.eps.is_zero()
    }
}

impl<T: Scalar> One for Dual<T> {
    #[inline]
    fn one() -> Self {
        Dual::constant(T::one())
    }
}

impl<T: Scalar> Zero for Reverse<'_, T> {
    #[inline]
    fn zero() -> Self {
        Reverse::constant(T::zero())
    }

    /// Only untracked zeros count: a recorded variable that happens to be
    /// zero still has a derivative.
    #[inline]
    fn is_zero(&self) -> bool {
        self.index == crate::tape::CONSTANT && self.value.is_zero()
    }
}

impl<T: Scalar> One for Reverse<'_, T> {
    #[inline]
    fn one() -> Self {
        Reverse::constant(T::one())
    }
}
