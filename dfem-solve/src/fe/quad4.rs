//! Bilinear quadrilateral: shape functions, 2×2 Gauss rule and the per-cell
//! data the kernels integrate with.

use crate::error::FemError;

/// Reference corners, counter-clockwise from `(-1, -1)`.
const CORNERS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Abscissa of the 2-point Gauss rule on `[-1, 1]` (weights are 1).
const GAUSS: f64 = 0.577_350_269_189_625_8;

/// Shape values and reference gradients at `(xi, eta)`.
pub fn shape(xi: f64, eta: f64) -> ([f64; 4], [[f64; 2]; 4]) {
    let mut n = [0.0; 4];
    let mut dn = [[0.0; 2]; 4];
    for (a, &[xa, ya]) in CORNERS.iter().enumerate() {
        n[a] = 0.25 * (1.0 + xi * xa) * (1.0 + eta * ya);
        dn[a] = [
            0.25 * xa * (1.0 + eta * ya),
            0.25 * ya * (1.0 + xi * xa),
        ];
    }
    (n, dn)
}

/// Data at one quadrature point of a physical cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadPoint {
    /// `N_a`.
    pub shape: [f64; 4],
    /// `∂N_a/∂x_i`.
    pub grad: [[f64; 2]; 4],
    /// Quadrature weight times the Jacobian determinant.
    pub jxw: f64,
}

/// Precomputed quadrature data of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGeometry {
    pub points: [QuadPoint; 4],
}

impl CellGeometry {
    /// Map the 2×2 Gauss rule onto the cell with corners `x`. Fails on
    /// degenerate or clockwise cells.
    pub fn new(x: [[f64; 2]; 4]) -> Result<Self, FemError> {
        let gauss = [[-GAUSS, -GAUSS], [GAUSS, -GAUSS], [GAUSS, GAUSS], [-GAUSS, GAUSS]];
        let mut points = [QuadPoint {
            shape: [0.0; 4],
            grad: [[0.0; 2]; 4],
            jxw: 0.0,
        }; 4];

        for (q, &[xi, eta]) in gauss.iter().enumerate() {
            let (n, dn) = shape(xi, eta);
            // jac[i][k] = ∂x_i/∂ξ_k
            let mut jac = [[0.0; 2]; 2];
            for a in 0..4 {
                for i in 0..2 {
                    for k in 0..2 {
                        jac[i][k] += x[a][i] * dn[a][k];
                    }
                }
            }
            let det = jac[0][0] * jac[1][1] - jac[0][1] * jac[1][0];
            if !(det > 0.0) {
                return Err(FemError::InvalidProblem(format!(
                    "cell with corners {x:?} has non-positive Jacobian {det}"
                )));
            }
            let inv = [
                [jac[1][1] / det, -jac[0][1] / det],
                [-jac[1][0] / det, jac[0][0] / det],
            ];
            let mut grad = [[0.0; 2]; 4];
            for a in 0..4 {
                for i in 0..2 {
                    grad[a][i] = dn[a][0] * inv[0][i] + dn[a][1] * inv[1][i];
                }
            }
            points[q] = QuadPoint {
                shape: n,
                grad,
                jxw: det,
            };
        }
        Ok(CellGeometry { points })
    }

    /// Cell area (sum of `JxW`).
    pub fn area(&self) -> f64 {
        self.points.iter().map(|q| q.jxw).sum()
    }
}

/// 2-point Gauss rule on the segment `a → b`: `(point, [N_a, N_b], weight)`
/// with the weight including the length scale.
pub fn edge_quadrature(a: [f64; 2], b: [f64; 2]) -> [([f64; 2], [f64; 2], f64); 2] {
    let half_len = 0.5 * ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
    [-GAUSS, GAUSS].map(|t| {
        let na = 0.5 * (1.0 - t);
        let nb = 0.5 * (1.0 + t);
        let point = [na * a[0] + nb * b[0], na * a[1] + nb * b[1]];
        (point, [na, nb], half_len)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn partition_of_unity() {
        let (n, dn) = shape(0.3, -0.7);
        assert_relative_eq!(n.iter().sum::<f64>(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(dn.iter().map(|g| g[0]).sum::<f64>(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn geometry_of_a_stretched_cell() {
        let cell = CellGeometry::new([[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0]]).unwrap();
        assert_relative_eq!(cell.area(), 2.0, epsilon = 1e-14);
        // u = x has gradient (1, 0) everywhere.
        let xs = [0.0, 2.0, 2.0, 0.0];
        for q in &cell.points {
            let gx: f64 = (0..4).map(|a| xs[a] * q.grad[a][0]).sum();
            let gy: f64 = (0..4).map(|a| xs[a] * q.grad[a][1]).sum();
            assert_relative_eq!(gx, 1.0, epsilon = 1e-14);
            assert_relative_eq!(gy, 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn clockwise_cell_is_rejected() {
        assert!(CellGeometry::new([[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]).is_err());
    }

    #[test]
    fn edge_rule_integrates_linears() {
        let rule = edge_quadrature([0.0, 0.0], [0.0, 3.0]);
        let total: f64 = rule.iter().map(|(_, _, w)| w).sum();
        let moment: f64 = rule.iter().map(|(x, _, w)| x[1] * w).sum();
        assert_relative_eq!(total, 3.0, epsilon = 1e-14);
        assert_relative_eq!(moment, 4.5, epsilon = 1e-14);
    }
}
