/// Stopping rule for the Newton iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewtonConfig {
    /// Maximum number of Newton steps (default: 50).
    pub max_iter: usize,
    /// Stop when `||r|| <= abs_tol` (default: 1e-10).
    pub abs_tol: f64,
    /// Stop when `||r|| <= rel_tol * ||r_0||` (default: 1e-10).
    pub rel_tol: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        NewtonConfig {
            max_iter: 50,
            abs_tol: 1e-10,
            rel_tol: 1e-10,
        }
    }
}

impl NewtonConfig {
    /// Whether `residual_norm` satisfies either tolerance.
    #[inline]
    pub fn is_converged(&self, residual_norm: f64, initial_norm: f64) -> bool {
        residual_norm <= self.abs_tol || residual_norm <= self.rel_tol * initial_norm
    }
}

/// Parameters of the restarted GMRES backend.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KrylovConfig {
    /// Krylov subspace dimension before a restart (default: 500, capped at
    /// the system size).
    pub restart: usize,
    /// Total inner iterations across restarts (default: 20 000).
    pub max_iter: usize,
    /// Stop when `||b - A x|| <= rel_tol * ||b||` (default: 1e-12).
    pub rel_tol: f64,
}

impl Default for KrylovConfig {
    fn default() -> Self {
        KrylovConfig {
            restart: 500,
            max_iter: 20_000,
            rel_tol: 1e-12,
        }
    }
}

/// Compute the L2 norm of a vector.
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Compute the dot product of two vectors.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Infinity norm.
pub fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}
