use approx::assert_relative_eq;
use dfem::{Dual, Dual64, Scalar};

/// Central finite difference: (f(x+h) - f(x-h)) / 2h
fn finite_diff(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-6;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

/// Evaluate an AD-generic function on duals and compare with finite differences.
fn check_generic(f_dual: impl Fn(Dual64) -> Dual64, f_f64: impl Fn(f64) -> f64, x: f64) {
    let d = f_dual(Dual::variable(x));
    assert_relative_eq!(d.re, f_f64(x), max_relative = 1e-12);
    assert_relative_eq!(d.eps, finite_diff(&f_f64, x), max_relative = 1e-7);
}

// ── Arithmetic ──

#[test]
fn product_rule() {
    // (3 + ε)(4 + ε) = 12 + 7ε
    let c = Dual::new(3.0, 1.0) * Dual::new(4.0, 1.0);
    assert_relative_eq!(c.re, 12.0);
    assert_relative_eq!(c.eps, 7.0);
}

#[test]
fn quotient_rule() {
    // d/dx (x / (x+1)) at x=2: 1/(x+1)^2 = 1/9
    let x = Dual::variable(2.0);
    let y = x / (x + Dual::constant(1.0));
    assert_relative_eq!(y.re, 2.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(y.eps, 1.0 / 9.0, max_relative = 1e-12);
}

#[test]
fn recip_and_negation() {
    let x = Dual::variable(4.0);
    let r = -x.recip();
    assert_relative_eq!(r.re, -0.25);
    assert_relative_eq!(r.eps, 1.0 / 16.0);
}

// ── Scalar trait ──

fn simp<S: Scalar>(theta: S) -> S {
    S::from_f64(70.0) + theta.powi(3) * S::from_f64(69_930.0)
}

fn stiffness_ratio<S: Scalar>(x: S) -> S {
    (x * x + S::one()).sqrt() / (x + S::from_f64(2.0))
}

#[test]
fn generic_functions_match_finite_differences() {
    check_generic(simp, simp, 0.5);
    check_generic(stiffness_ratio, stiffness_ratio, 1.3);
    check_generic(|x| x.powi(-2), |x| x.powi(-2), 0.7);
}

#[test]
fn powi_agrees_across_modes() {
    let d = Dual::variable(1.7).powi(5);
    let g = dfem::grad(|x| x[0].powi(5), &[1.7]);
    assert_relative_eq!(d.eps, g[0], max_relative = 1e-14);
    assert_relative_eq!(d.eps, 5.0 * 1.7_f64.powi(4), max_relative = 1e-14);
}

#[test]
fn finiteness_looks_at_tangent() {
    assert!(Dual::new(1.0, 2.0).is_finite());
    assert!(!Dual::new(1.0, f64::NAN).is_finite());
    // sqrt at zero has an infinite slope.
    assert!(!Dual::variable(0.0).sqrt().is_finite());
}

// ── Nesting ──

#[test]
fn dual_of_dual_gives_second_derivative() {
    // f(x) = x³, f''(2) = 12
    let x = Dual::new(Dual::new(2.0, 1.0), Dual::new(1.0, 0.0));
    let y = x * x * x;
    assert_relative_eq!(y.re.re, 8.0);
    assert_relative_eq!(y.re.eps, 12.0);
    assert_relative_eq!(y.eps.re, 12.0);
    assert_relative_eq!(y.eps.eps, 12.0);
}

// ── Whole-function transforms ──

#[test]
fn jvp_matches_jacobian_column_combination() {
    let f = |x: &[Dual64]| vec![x[0] * x[1], x[1].sqrt() + x[0]];
    let x = [2.0, 9.0];
    let v = [0.5, -1.0];
    let (vals, tangent) = dfem::jvp(f, &x, &v);
    let (vals_j, jac) = dfem::jacobian(f, &x);
    assert_eq!(vals, vals_j);
    for i in 0..2 {
        let expected = jac[i][0] * v[0] + jac[i][1] * v[1];
        assert_relative_eq!(tangent[i], expected, max_relative = 1e-14);
    }
    assert_relative_eq!(jac[1][1], 1.0 / 6.0, max_relative = 1e-14);
}
