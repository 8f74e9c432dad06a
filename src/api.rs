//! Whole-function transforms over closures.
//!
//! Reverse-mode entry points take closures that are generic over the tape
//! lifetime (`for<'t> FnOnce(&[Reverse<'t, T>]) -> ...`). A closure literal
//! passed straight to one of these functions is inferred that way; the tape
//! is created here and cannot escape the call.

use crate::dual::Dual;
use crate::reverse::Reverse;
use crate::tape::{Tape, CONSTANT};
use crate::Scalar;

/// Register `x` as the independent variables of `tape`.
fn record_inputs<'t, T: Scalar>(tape: &'t Tape<T>, x: &[T]) -> Vec<Reverse<'t, T>> {
    x.iter().map(|&xi| Reverse::variable(tape, xi)).collect()
}

/// Gradient of `f: Rⁿ → R` by one reverse sweep.
///
/// ```
/// let g = dfem::grad(|x| x[0] * x[0] + x[1] * x[1], &[3.0_f64, 4.0]);
/// assert!((g[0] - 6.0).abs() < 1e-10);
/// assert!((g[1] - 8.0).abs() < 1e-10);
/// ```
pub fn grad<T: Scalar>(
    f: impl for<'t> FnOnce(&[Reverse<'t, T>]) -> Reverse<'t, T>,
    x: &[T],
) -> Vec<T> {
    value_and_grad(f, x).1
}

/// `(f(x), ∇f(x))`.
pub fn value_and_grad<T: Scalar>(
    f: impl for<'t> FnOnce(&[Reverse<'t, T>]) -> Reverse<'t, T>,
    x: &[T],
) -> (T, Vec<T>) {
    let tape = Tape::with_capacity(8 * x.len());
    let output = f(&record_inputs(&tape, x));
    // An output that never touched the inputs was not recorded.
    if output.index == CONSTANT {
        return (output.value, vec![T::zero(); x.len()]);
    }
    let mut adjoints = tape.reverse(output.index);
    adjoints.truncate(x.len());
    (output.value, adjoints)
}

/// `(f(x), J v)` by one forward pass.
pub fn jvp<T: Scalar>(
    f: impl FnOnce(&[Dual<T>]) -> Vec<Dual<T>>,
    x: &[T],
    v: &[T],
) -> (Vec<T>, Vec<T>) {
    assert_eq!(x.len(), v.len(), "direction length must match input length");
    Dual::unzip(&f(&Dual::seed(x, v)))
}

/// `(f(x), Jᵀ w)` by one reverse sweep seeded with `w`.
pub fn vjp<T: Scalar>(
    f: impl for<'t> FnOnce(&[Reverse<'t, T>]) -> Vec<Reverse<'t, T>>,
    x: &[T],
    w: &[T],
) -> (Vec<T>, Vec<T>) {
    let tape = Tape::with_capacity(8 * x.len());
    let outputs = f(&record_inputs(&tape, x));
    assert_eq!(outputs.len(), w.len(), "weight length must match output length");

    let seeds: Vec<(u32, T)> = outputs.iter().zip(w).map(|(y, &wi)| (y.index, wi)).collect();
    let mut adjoints = tape.reverse_seeded(&seeds);
    adjoints.truncate(x.len());
    (outputs.iter().map(|y| y.value).collect(), adjoints)
}

/// Dense Jacobian `J[i][j] = ∂fᵢ/∂xⱼ` by one forward pass per input.
pub fn jacobian<T: Scalar>(
    f: impl Fn(&[Dual<T>]) -> Vec<Dual<T>>,
    x: &[T],
) -> (Vec<T>, Vec<Vec<T>>) {
    let mut inputs: Vec<Dual<T>> = x.iter().map(|&xi| Dual::constant(xi)).collect();
    let values: Vec<T> = f(&inputs).iter().map(|y| y.re).collect();

    let mut jac = vec![vec![T::zero(); x.len()]; values.len()];
    for j in 0..x.len() {
        inputs[j].eps = T::one();
        for (row, y) in jac.iter_mut().zip(f(&inputs)) {
            row[j] = y.eps;
        }
        inputs[j].eps = T::zero();
    }
    (values, jac)
}

/// Hessian-vector product by forward-over-reverse: the reverse sweep runs on
/// dual numbers seeded with `v`, so each adjoint carries `∂(∇f)/∂x · v`.
///
/// Returns `(∇f(x), H v)`.
pub fn hvp<T: Scalar>(
    f: impl for<'t> FnOnce(&[Reverse<'t, Dual<T>>]) -> Reverse<'t, Dual<T>>,
    x: &[T],
    v: &[T],
) -> (Vec<T>, Vec<T>) {
    assert_eq!(x.len(), v.len(), "direction length must match input length");
    let (_, g) = value_and_grad(f, &Dual::seed(x, v));
    Dual::unzip(&g)
}
