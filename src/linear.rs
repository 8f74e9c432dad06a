//! Linear maps with an explicit transpose.
//!
//! A [`LinearMap`] is the currency of forward-mode rules: a tangent rule
//! linearizes an operation at a point, and the matching cotangent rule is the
//! transpose of that map. Composition ([`LinearMap::then`]) transposes by
//! reversing the stages, so a rule assembled from primitives that each know
//! their own transpose gets its reverse mode for free.

use crate::error::{check_dim, DiffError};
use crate::Scalar;

/// A linear operator `R^n → R^m` together with its transpose `R^m → R^n`.
pub trait LinearMap<T: Scalar> {
    /// Error raised by a failing stage (a linear solve, say).
    type Error;

    /// `n`, the length accepted by [`apply`](Self::apply).
    fn input_dim(&self) -> usize;

    /// `m`, the length returned by [`apply`](Self::apply).
    fn output_dim(&self) -> usize;

    /// `y = A x`.
    fn apply(&self, x: &[T]) -> Result<Vec<T>, Self::Error>;

    /// `x = Aᵀ y`.
    fn apply_transpose(&self, y: &[T]) -> Result<Vec<T>, Self::Error>;

    /// `next ∘ self`: apply `self` first, then `next`.
    fn then<B>(self, next: B) -> Chain<Self, B>
    where
        Self: Sized,
        B: LinearMap<T, Error = Self::Error>,
    {
        debug_assert_eq!(self.output_dim(), next.input_dim());
        Chain { first: self, second: next }
    }

    /// `factor · self`.
    fn scaled(self, factor: T) -> Scaled<Self, T>
    where
        Self: Sized,
    {
        Scaled { inner: self, factor }
    }

    /// `selfᵀ`, with `apply` and `apply_transpose` swapped.
    fn transposed(self) -> Transposed<Self>
    where
        Self: Sized,
    {
        Transposed { inner: self }
    }
}

impl<T: Scalar, M: LinearMap<T> + ?Sized> LinearMap<T> for Box<M> {
    type Error = M::Error;

    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn output_dim(&self) -> usize {
        (**self).output_dim()
    }

    fn apply(&self, x: &[T]) -> Result<Vec<T>, Self::Error> {
        (**self).apply(x)
    }

    fn apply_transpose(&self, y: &[T]) -> Result<Vec<T>, Self::Error> {
        (**self).apply_transpose(y)
    }
}

/// Composition of two maps; see [`LinearMap::then`].
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<T, A, B> LinearMap<T> for Chain<A, B>
where
    T: Scalar,
    A: LinearMap<T>,
    B: LinearMap<T, Error = A::Error>,
{
    type Error = A::Error;

    fn input_dim(&self) -> usize {
        self.first.input_dim()
    }

    fn output_dim(&self) -> usize {
        self.second.output_dim()
    }

    fn apply(&self, x: &[T]) -> Result<Vec<T>, Self::Error> {
        let mid = self.first.apply(x)?;
        self.second.apply(&mid)
    }

    // (B A)ᵀ = Aᵀ Bᵀ
    fn apply_transpose(&self, y: &[T]) -> Result<Vec<T>, Self::Error> {
        let mid = self.second.apply_transpose(y)?;
        self.first.apply_transpose(&mid)
    }
}

/// A map multiplied by a scalar; see [`LinearMap::scaled`].
#[derive(Debug, Clone)]
pub struct Scaled<M, T> {
    inner: M,
    factor: T,
}

impl<T: Scalar, M: LinearMap<T>> LinearMap<T> for Scaled<M, T> {
    type Error = M::Error;

    fn input_dim(&self) -> usize {
        self.inner.input_dim()
    }

    fn output_dim(&self) -> usize {
        self.inner.output_dim()
    }

    fn apply(&self, x: &[T]) -> Result<Vec<T>, Self::Error> {
        let mut y = self.inner.apply(x)?;
        y.iter_mut().for_each(|yi| *yi *= self.factor);
        Ok(y)
    }

    fn apply_transpose(&self, y: &[T]) -> Result<Vec<T>, Self::Error> {
        let mut x = self.inner.apply_transpose(y)?;
        x.iter_mut().for_each(|xi| *xi *= self.factor);
        Ok(x)
    }
}

/// The transpose of a map; see [`LinearMap::transposed`].
#[derive(Debug, Clone)]
pub struct Transposed<M> {
    inner: M,
}

impl<M> Transposed<M> {
    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<T: Scalar, M: LinearMap<T>> LinearMap<T> for Transposed<M> {
    type Error = M::Error;

    fn input_dim(&self) -> usize {
        self.inner.output_dim()
    }

    fn output_dim(&self) -> usize {
        self.inner.input_dim()
    }

    fn apply(&self, x: &[T]) -> Result<Vec<T>, Self::Error> {
        self.inner.apply_transpose(x)
    }

    fn apply_transpose(&self, y: &[T]) -> Result<Vec<T>, Self::Error> {
        self.inner.apply(y)
    }
}

/// Identity on `R^n`.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub dim: usize,
}

impl<T: Scalar> LinearMap<T> for Identity {
    type Error = DiffError;

    fn input_dim(&self) -> usize {
        self.dim
    }

    fn output_dim(&self) -> usize {
        self.dim
    }

    fn apply(&self, x: &[T]) -> Result<Vec<T>, DiffError> {
        check_dim("identity input", self.dim, x.len())?;
        Ok(x.to_vec())
    }

    fn apply_transpose(&self, y: &[T]) -> Result<Vec<T>, DiffError> {
        self.apply(y)
    }
}
