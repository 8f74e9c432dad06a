//! Shared fixtures and finite-difference helpers for the integration tests.

#![allow(dead_code)]

use dfem_solve::fe::{self, DirichletBc, Elasticity, FeProblem, NonlinearPoisson};

/// Central-difference step for reduced objectives.
pub const FD_EPS: f64 = 1e-4;

/// The 20×10 cantilever on `[0, 20] × [0, 10]`: 462 dofs, 200 parameters.
pub fn cantilever() -> FeProblem<Elasticity> {
    fe::cantilever(20, 10, 20.0, 10.0).unwrap()
}

/// Uniform half density.
pub fn uniform_design(n: usize) -> Vec<f64> {
    vec![0.5; n]
}

/// A smooth, non-uniform density field in `[0.3, 0.9]`.
pub fn graded_design(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.6 + 0.3 * (0.7 * i as f64).sin())
        .collect()
}

/// Nonlinear Poisson on the unit square, `u = 0` on the whole boundary.
pub fn poisson(nx: usize, ny: usize) -> FeProblem<NonlinearPoisson> {
    const TOL: f64 = 1e-9;
    let mesh = fe::rectangle_mesh(nx, ny, 1.0, 1.0).unwrap();
    let boundary =
        |x: [f64; 2]| x[0] < TOL || x[0] > 1.0 - TOL || x[1] < TOL || x[1] > 1.0 - TOL;
    FeProblem::new(
        mesh,
        NonlinearPoisson::default(),
        &[DirichletBc::fixed(boundary, 0)],
        &[],
    )
    .unwrap()
}

/// `(f(p + h eᵢ) − f(p − h eᵢ)) / 2h`
pub fn central_difference(f: &mut impl FnMut(&[f64]) -> f64, p: &[f64], i: usize) -> f64 {
    let mut pp = p.to_vec();
    let mut pm = p.to_vec();
    pp[i] += FD_EPS;
    pm[i] -= FD_EPS;
    (f(&pp) - f(&pm)) / (2.0 * FD_EPS)
}

/// `(f(p + h v) − f(p − h v)) / 2h`
pub fn directional_difference(f: &mut impl FnMut(&[f64]) -> f64, p: &[f64], v: &[f64]) -> f64 {
    let pp: Vec<f64> = p.iter().zip(v).map(|(a, b)| a + FD_EPS * b).collect();
    let pm: Vec<f64> = p.iter().zip(v).map(|(a, b)| a - FD_EPS * b).collect();
    (f(&pp) - f(&pm)) / (2.0 * FD_EPS)
}

/// Component-wise central difference of a vector-valued `g` along `v`.
pub fn directional_difference_vec(
    g: &mut impl FnMut(&[f64]) -> Vec<f64>,
    p: &[f64],
    v: &[f64],
) -> Vec<f64> {
    let pp: Vec<f64> = p.iter().zip(v).map(|(a, b)| a + FD_EPS * b).collect();
    let pm: Vec<f64> = p.iter().zip(v).map(|(a, b)| a - FD_EPS * b).collect();
    let (gp, gm) = (g(&pp), g(&pm));
    gp.iter()
        .zip(&gm)
        .map(|(a, b)| (a - b) / (2.0 * FD_EPS))
        .collect()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// A fixed pseudo-random direction with entries in `[-1, 1]`.
pub fn direction(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        })
        .collect()
}
