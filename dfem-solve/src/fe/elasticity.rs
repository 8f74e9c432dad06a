use dfem::Scalar;

use super::assembly::{CellKernel, DirichletBc, FeProblem, NeumannBc};
use super::mesh::rectangle_mesh;
use super::quad4::CellGeometry;
use crate::error::FemError;

/// Plane-strain linear elasticity with a SIMP-interpolated Young's modulus
/// `E(θ) = E_min + θ^penal (E_max − E_min)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elasticity {
    pub e_max: f64,
    pub e_min: f64,
    pub nu: f64,
    pub penal: i32,
}

impl Default for Elasticity {
    fn default() -> Self {
        Elasticity {
            e_max: 70e3,
            e_min: 70.0,
            nu: 0.3,
            penal: 3,
        }
    }
}

impl Elasticity {
    pub fn young<S: Scalar>(&self, theta: S) -> S {
        S::from_f64(self.e_min) + theta.powi(self.penal) * S::from_f64(self.e_max - self.e_min)
    }
}

impl CellKernel for Elasticity {
    fn components(&self) -> usize {
        2
    }

    fn cell_residual<S: Scalar>(&self, cell: &CellGeometry, u_cell: &[S], theta: S) -> Vec<S> {
        let e = self.young(theta);
        let nu = self.nu;
        let normal = e * S::from_f64(1.0 / ((1.0 + nu) * (1.0 - 2.0 * nu)));
        let shear = e * S::from_f64(1.0 / (1.0 + nu));

        let mut r = vec![S::zero(); 8];
        for q in &cell.points {
            // grad[i][j] = ∂u_i/∂x_j
            let mut grad = [[S::zero(); 2]; 2];
            for a in 0..4 {
                for i in 0..2 {
                    for j in 0..2 {
                        grad[i][j] += u_cell[2 * a + i] * S::from_f64(q.grad[a][j]);
                    }
                }
            }
            let eps11 = grad[0][0];
            let eps22 = grad[1][1];
            let eps12 = S::from_f64(0.5) * (grad[0][1] + grad[1][0]);

            let sig11 = normal * (S::from_f64(1.0 - nu) * eps11 + S::from_f64(nu) * eps22);
            let sig22 = normal * (S::from_f64(nu) * eps11 + S::from_f64(1.0 - nu) * eps22);
            let sig12 = shear * eps12;

            let jxw = S::from_f64(q.jxw);
            for a in 0..4 {
                let [dx, dy] = q.grad[a].map(S::from_f64);
                r[2 * a] += (sig11 * dx + sig12 * dy) * jxw;
                r[2 * a + 1] += (sig12 * dx + sig22 * dy) * jxw;
            }
        }
        r
    }
}

/// Cantilever benchmark on `[0, lx] × [0, ly]` with an `nx × ny` mesh:
/// clamped at `x = 0`, traction `(0, −100)` on the part of `x = lx` with
/// `y ≤ 0.1 ly`.
pub fn cantilever(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<FeProblem<Elasticity>, FemError> {
    const TOL: f64 = 1e-5;
    let mesh = rectangle_mesh(nx, ny, lx, ly)?;
    let left = |x: [f64; 2]| x[0].abs() < TOL;
    let dirichlet = [DirichletBc::fixed(left, 0), DirichletBc::fixed(left, 1)];
    let neumann = [NeumannBc::new(
        move |x| (x[0] - lx).abs() < TOL && x[1] <= 0.1 * ly + TOL,
        |_| vec![0.0, -100.0],
    )];
    FeProblem::new(mesh, Elasticity::default(), &dirichlet, &neumann)
}
