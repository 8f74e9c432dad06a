//! Restarted GMRES on the rayon pool.
//!
//! Right-preconditioned with the inverse diagonal (Jacobi), orthogonalized by
//! classical Gram–Schmidt with one reorthogonalization pass, least-squares
//! problem reduced by Givens rotations. Every reduction is evaluated over
//! fixed-size chunks and summed in order, so a solve is bitwise reproducible
//! regardless of how rayon schedules the work.

use dfem::{CsrMatrix, LinearSolve};
use rayon::prelude::*;
use tracing::{debug, warn};

use super::{backward_error, check_system, verified};
use crate::convergence::{dot, KrylovConfig};
use crate::error::LinearSolveError;

const CHUNK: usize = 1024;

/// A restart cycle that keeps more than this fraction of the residual made no progress.
const STAGNATION: f64 = 0.999;

/// Accept a stagnated iterate whose backward error is this close to round-off.
const ROUNDOFF_FLOOR: f64 = 1e-13;

/// Iterative backend standing in for an external parallel linear-algebra
/// library.
#[derive(Debug, Clone)]
pub struct ParallelGmres {
    config: KrylovConfig,
}

impl Default for ParallelGmres {
    fn default() -> Self {
        Self::new(KrylovConfig::default())
    }
}

impl ParallelGmres {
    pub const NAME: &'static str = "parallel-gmres";

    pub fn new(config: KrylovConfig) -> Self {
        ParallelGmres { config }
    }

    pub fn config(&self) -> &KrylovConfig {
        &self.config
    }

    fn gmres(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, LinearSolveError> {
        let n = a.nrows();
        let b_norm = par_norm(b);
        if b_norm == 0.0 {
            return Ok(vec![0.0; n]);
        }
        let tol = self.config.rel_tol * b_norm;
        let m = self.config.restart.clamp(1, n.max(1));

        let inv_diag: Vec<f64> = a
            .diagonal()
            .into_iter()
            .map(|d| if d != 0.0 && d.is_finite() { 1.0 / d } else { 1.0 })
            .collect();

        let mut x = vec![0.0; n];
        let mut iterations = 0usize;
        let mut cycle = 0usize;
        let mut prev_res = f64::INFINITY;

        loop {
            let ax = par_matvec(a, &x);
            let r: Vec<f64> = b.par_iter().zip(ax.par_iter()).map(|(bi, ai)| bi - ai).collect();
            let beta = par_norm(&r);
            debug!(cycle, iterations, relative_residual = beta / b_norm, "gmres restart");

            if beta <= tol {
                return Ok(x);
            }
            if !beta.is_finite() {
                return Err(LinearSolveError::Inaccurate {
                    backend: Self::NAME,
                    backward_error: f64::INFINITY,
                });
            }
            if beta >= STAGNATION * prev_res || iterations >= self.config.max_iter {
                // No progress over a whole cycle: accept only a round-off
                // limited iterate.
                if backward_error(a, &x, b, false) <= ROUNDOFF_FLOOR {
                    warn!(relative_residual = beta / b_norm, "gmres stagnated at round-off");
                    return Ok(x);
                }
                return Err(LinearSolveError::Stalled {
                    backend: Self::NAME,
                    iterations,
                    relative_residual: beta / b_norm,
                });
            }
            prev_res = beta;

            let mut basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
            basis.push(r.iter().map(|ri| ri / beta).collect());
            let mut hessenberg: Vec<Vec<f64>> = Vec::with_capacity(m);
            let mut rotations: Vec<(f64, f64)> = Vec::with_capacity(m);
            let mut g = vec![0.0; m + 1];
            g[0] = beta;

            for j in 0..m {
                if iterations >= self.config.max_iter {
                    break;
                }
                let z: Vec<f64> = basis[j].iter().zip(&inv_diag).map(|(v, d)| v * d).collect();
                let mut w = par_matvec(a, &z);

                let mut h = project_out(&basis, &mut w);
                let correction = project_out(&basis, &mut w);
                h.iter_mut().zip(&correction).for_each(|(hi, ci)| *hi += ci);
                let w_norm = par_norm(&w);
                h.push(w_norm);

                for (i, &(c, s)) in rotations.iter().enumerate() {
                    let t = c * h[i] + s * h[i + 1];
                    h[i + 1] = -s * h[i] + c * h[i + 1];
                    h[i] = t;
                }
                let denom = h[j].hypot(h[j + 1]);
                if denom == 0.0 {
                    return Err(LinearSolveError::Singular {
                        backend: Self::NAME,
                        reason: format!("Krylov breakdown at iteration {iterations}"),
                    });
                }
                let (c, s) = (h[j] / denom, h[j + 1] / denom);
                h[j] = denom;
                h[j + 1] = 0.0;
                g[j + 1] = -s * g[j];
                g[j] *= c;
                rotations.push((c, s));
                hessenberg.push(h);
                iterations += 1;

                if g[j + 1].abs() <= tol || w_norm == 0.0 {
                    break;
                }
                basis.push(w.iter().map(|wi| wi / w_norm).collect());
            }

            // Back substitution on the triangular factor, then x += M^{-1} V y.
            let k = hessenberg.len();
            let mut y = vec![0.0; k];
            for i in (0..k).rev() {
                let mut acc = g[i];
                for (l, yl) in y.iter().enumerate().skip(i + 1) {
                    acc -= hessenberg[l][i] * yl;
                }
                y[i] = acc / hessenberg[i][i];
            }
            x.par_iter_mut().enumerate().for_each(|(row, xi)| {
                let mut update = 0.0;
                for (v, yl) in basis.iter().zip(&y) {
                    update += v[row] * yl;
                }
                *xi += inv_diag[row] * update;
            });
            cycle += 1;
        }
    }
}

impl LinearSolve for ParallelGmres {
    type Error = LinearSolveError;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn solve(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, LinearSolveError> {
        check_system(Self::NAME, a, b)?;
        let x = self.gmres(a, b)?;
        verified(Self::NAME, a, x, b, false)
    }

    fn solve_transpose(
        &self,
        a: &CsrMatrix<f64>,
        b: &[f64],
    ) -> Result<Vec<f64>, LinearSolveError> {
        check_system(Self::NAME, a, b)?;
        let x = self.gmres(&a.transpose(), b)?;
        verified(Self::NAME, a, x, b, true)
    }
}

// ══════════════════════════════════════════════
//  Deterministic parallel kernels
// ══════════════════════════════════════════════

fn par_matvec(a: &CsrMatrix<f64>, x: &[f64]) -> Vec<f64> {
    (0..a.nrows())
        .into_par_iter()
        .map(|i| {
            let (cols, vals) = a.row(i);
            cols.iter().zip(vals).map(|(&j, v)| v * x[j]).sum::<f64>()
        })
        .collect()
}

fn par_dot(a: &[f64], b: &[f64]) -> f64 {
    let partials: Vec<f64> = a
        .par_chunks(CHUNK)
        .zip(b.par_chunks(CHUNK))
        .map(|(x, y)| dot(x, y))
        .collect();
    partials.iter().sum()
}

fn par_norm(v: &[f64]) -> f64 {
    par_dot(v, v).sqrt()
}

/// One classical Gram–Schmidt pass: `h = Vᵀ w`, `w -= V h`.
fn project_out(basis: &[Vec<f64>], w: &mut [f64]) -> Vec<f64> {
    let h: Vec<f64> = basis.par_iter().map(|v| par_dot(v, w)).collect();
    w.par_iter_mut().enumerate().for_each(|(row, wi)| {
        for (v, hj) in basis.iter().zip(&h) {
            *wi -= hj * v[row];
        }
    });
    h
}
