use dfem::Scalar;

use super::assembly::CellKernel;
use super::quad4::CellGeometry;

/// Nonlinear diffusion `−∇·(k(θ)(1 + α u²)∇u) = f` with
/// `k(θ) = k_min + θ^penal (1 − k_min)`.
///
/// `alpha = 0` makes the problem linear in `u`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonlinearPoisson {
    pub k_min: f64,
    pub alpha: f64,
    pub source: f64,
    pub penal: i32,
}

impl Default for NonlinearPoisson {
    fn default() -> Self {
        NonlinearPoisson {
            k_min: 1e-3,
            alpha: 1.0,
            source: 10.0,
            penal: 3,
        }
    }
}

impl CellKernel for NonlinearPoisson {
    fn components(&self) -> usize {
        1
    }

    fn cell_residual<S: Scalar>(&self, cell: &CellGeometry, u_cell: &[S], theta: S) -> Vec<S> {
        let k = S::from_f64(self.k_min) + theta.powi(self.penal) * S::from_f64(1.0 - self.k_min);
        let alpha = S::from_f64(self.alpha);
        let f = S::from_f64(self.source);

        let mut r = vec![S::zero(); 4];
        for q in &cell.points {
            let mut u_h = S::zero();
            let mut grad = [S::zero(); 2];
            for a in 0..4 {
                u_h += S::from_f64(q.shape[a]) * u_cell[a];
                grad[0] += S::from_f64(q.grad[a][0]) * u_cell[a];
                grad[1] += S::from_f64(q.grad[a][1]) * u_cell[a];
            }
            let flux = k * (S::one() + alpha * u_h * u_h);
            let jxw = S::from_f64(q.jxw);
            for a in 0..4 {
                let [dx, dy] = q.grad[a].map(S::from_f64);
                r[a] += (flux * (grad[0] * dx + grad[1] * dy) - S::from_f64(q.shape[a]) * f) * jxw;
            }
        }
        r
    }
}
