//! Differentiation core for implicit finite-element solves.
//!
//! - [`Dual`] numbers (forward mode) and [`Reverse`] variables recorded on an
//!   explicit [`Tape`] (reverse mode), both nestable through [`Scalar`].
//! - Whole-function transforms: [`grad`], [`jvp`], [`vjp`], [`jacobian`],
//!   [`hvp`].
//! - [`LinearMap`] with transposition, and [`CsrMatrix`] as a scalar-generic
//!   sparse operator.
//! - The linear-solve primitive ([`LinearSolve`], [`SolveScalar`]) with its
//!   own tangent rule.
//! - Custom rules for opaque operations ([`DifferentiableOp`]) and the
//!   transforms that consume them ([`custom`]).

pub mod api;
pub mod custom;
pub mod dual;
pub mod error;
pub mod float;
pub mod linear;
pub mod reverse;
pub mod scalar;
pub mod solve;
pub mod sparse;
pub mod tape;
mod traits;

pub use api::{grad, hvp, jacobian, jvp, value_and_grad, vjp};
pub use custom::{DifferentiableOp, Linearization};
pub use dual::Dual;
pub use error::{DiffError, RuleMode};
pub use float::Float;
pub use linear::LinearMap;
pub use reverse::Reverse;
pub use scalar::Scalar;
pub use solve::{LinearSolve, SolveScalar};
pub use sparse::CsrMatrix;
pub use tape::Tape;

/// Type alias for forward-mode dual numbers over `f64`.
pub type Dual64 = Dual<f64>;
/// Type alias for reverse-mode variables over `f64`.
pub type Reverse64<'t> = Reverse<'t, f64>;
