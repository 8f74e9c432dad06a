//! Generic assembly of cell kernels into a [`Problem`].

use std::fmt;

use dfem::{CsrMatrix, Dual, Scalar};
use tracing::debug;

use super::mesh::Mesh;
use super::quad4::{edge_quadrature, CellGeometry};
use crate::convergence::norm;
use crate::error::{check_shape, FemError};
use crate::problem::Problem;

type PointPredicate = Box<dyn Fn([f64; 2]) -> bool + Send + Sync>;

/// Physics of one cell: the weak-form residual as a function of the cell's
/// nodal values and the cell's design parameter.
pub trait CellKernel {
    /// Solution components per node (1 for scalar fields, 2 for plane
    /// displacements).
    fn components(&self) -> usize;

    /// Residual contributions, node-major (`[a * components + i]`), for the
    /// nodal values `u_cell` laid out the same way.
    fn cell_residual<S: Scalar>(&self, cell: &CellGeometry, u_cell: &[S], theta: S) -> Vec<S>;
}

/// Prescribed value of one solution component on the points selected by
/// `location`.
pub struct DirichletBc {
    location: PointPredicate,
    component: usize,
    value: Box<dyn Fn([f64; 2]) -> f64 + Send + Sync>,
}

impl DirichletBc {
    pub fn new(
        location: impl Fn([f64; 2]) -> bool + Send + Sync + 'static,
        component: usize,
        value: impl Fn([f64; 2]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        DirichletBc {
            location: Box::new(location),
            component,
            value: Box::new(value),
        }
    }

    /// Homogeneous condition `u_component = 0`.
    pub fn fixed(location: impl Fn([f64; 2]) -> bool + Send + Sync + 'static, component: usize) -> Self {
        Self::new(location, component, |_| 0.0)
    }
}

impl fmt::Debug for DirichletBc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirichletBc")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

/// Surface load on boundary edges whose end points both satisfy `location`.
pub struct NeumannBc {
    location: PointPredicate,
    traction: Box<dyn Fn([f64; 2]) -> Vec<f64> + Send + Sync>,
}

impl NeumannBc {
    pub fn new(
        location: impl Fn([f64; 2]) -> bool + Send + Sync + 'static,
        traction: impl Fn([f64; 2]) -> Vec<f64> + Send + Sync + 'static,
    ) -> Self {
        NeumannBc {
            location: Box::new(location),
            traction: Box::new(traction),
        }
    }
}

impl fmt::Debug for NeumannBc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeumannBc").finish_non_exhaustive()
    }
}

/// A kernel assembled over a mesh with boundary data, one design parameter
/// per cell.
///
/// Dirichlet rows are eliminated by replacement: the residual of a
/// constrained dof is `u_i − g_i` and its Jacobian row is the unit row, while
/// the columns stay in place. The Jacobian is therefore unsymmetric even for
/// symmetric physics.
#[derive(Debug)]
pub struct FeProblem<K> {
    mesh: Mesh,
    kernel: K,
    geometry: Vec<CellGeometry>,
    /// `Some(g)` for constrained dofs.
    constraints: Vec<Option<f64>>,
    external: Vec<f64>,
}

impl<K: CellKernel> FeProblem<K> {
    pub fn new(
        mesh: Mesh,
        kernel: K,
        dirichlet: &[DirichletBc],
        neumann: &[NeumannBc],
    ) -> Result<Self, FemError> {
        let comps = kernel.components();
        let n = mesh.num_points() * comps;

        let geometry = (0..mesh.num_cells())
            .map(|c| CellGeometry::new(mesh.cell_points(c)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut constraints = vec![None; n];
        for bc in dirichlet {
            if bc.component >= comps {
                return Err(FemError::InvalidProblem(format!(
                    "Dirichlet component {} out of range for {comps}-component field",
                    bc.component
                )));
            }
            for (node, &x) in mesh.points.iter().enumerate() {
                if (bc.location)(x) {
                    constraints[node * comps + bc.component] = Some((bc.value)(x));
                }
            }
        }

        let mut external = vec![0.0; n];
        let boundary = mesh.boundary_edges();
        for bc in neumann {
            for &(a, b) in &boundary {
                let (xa, xb) = (mesh.points[a], mesh.points[b]);
                if !((bc.location)(xa) && (bc.location)(xb)) {
                    continue;
                }
                for (x, weights, w) in edge_quadrature(xa, xb) {
                    let t = (bc.traction)(x);
                    check_shape("traction vector", comps, t.len())?;
                    for (node, na) in [(a, weights[0]), (b, weights[1])] {
                        for (i, ti) in t.iter().enumerate() {
                            external[node * comps + i] += na * ti * w;
                        }
                    }
                }
            }
        }

        debug!(
            cells = mesh.num_cells(),
            dofs = n,
            constrained = constraints.iter().filter(|c| c.is_some()).count(),
            "assembled finite-element problem"
        );

        Ok(FeProblem {
            mesh,
            kernel,
            geometry,
            constraints,
            external,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Assembled surface loads, one entry per dof.
    pub fn external_load(&self) -> &[f64] {
        &self.external
    }

    /// Indices of Dirichlet-constrained dofs, ascending.
    pub fn constrained_dofs(&self) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|_| i))
            .collect()
    }

    fn cell_dofs(&self, c: usize) -> Vec<usize> {
        let comps = self.kernel.components();
        self.mesh.cells[c]
            .iter()
            .flat_map(|&node| (0..comps).map(move |i| node * comps + i))
            .collect()
    }
}

impl<K: CellKernel> Problem for FeProblem<K> {
    fn num_dofs(&self) -> usize {
        self.constraints.len()
    }

    fn num_params(&self) -> usize {
        self.mesh.num_cells()
    }

    /// Surface loads and prescribed values, without assembling the cells.
    fn residual_scale(&self, _p: &[f64]) -> f64 {
        let prescribed = self.constraints.iter().flatten();
        norm(&self.external.iter().chain(prescribed).copied().collect::<Vec<_>>())
    }

    fn residual<S: Scalar>(&self, u: &[S], p: &[S]) -> Vec<S> {
        let mut r: Vec<S> = self.external.iter().map(|&f| -S::from_f64(f)).collect();
        for (c, cell) in self.geometry.iter().enumerate() {
            let dofs = self.cell_dofs(c);
            let u_cell: Vec<S> = dofs.iter().map(|&d| u[d]).collect();
            let r_cell = self.kernel.cell_residual(cell, &u_cell, p[c]);
            for (&d, rc) in dofs.iter().zip(r_cell) {
                r[d] += rc;
            }
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            if let Some(g) = constraint {
                r[i] = u[i] - S::from_f64(*g);
            }
        }
        r
    }

    /// Cell Jacobians by forward mode over the kernel: one dual evaluation
    /// per local dof yields one column.
    fn jacobian<S: Scalar>(&self, u: &[S], p: &[S]) -> Result<CsrMatrix<S>, FemError> {
        let n = self.num_dofs();
        let mut triplets = Vec::new();
        for (c, cell) in self.geometry.iter().enumerate() {
            let dofs = self.cell_dofs(c);
            let theta = Dual::constant(p[c]);
            let mut u_cell: Vec<Dual<S>> = dofs.iter().map(|&d| Dual::constant(u[d])).collect();
            for (j, &col) in dofs.iter().enumerate() {
                u_cell[j].eps = S::one();
                let column = self.kernel.cell_residual(cell, &u_cell, theta);
                u_cell[j].eps = S::zero();
                for (&row, entry) in dofs.iter().zip(&column) {
                    if self.constraints[row].is_none() {
                        triplets.push((row, col, entry.eps));
                    }
                }
            }
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            if constraint.is_some() {
                triplets.push((i, i, S::one()));
            }
        }
        Ok(CsrMatrix::from_triplets(n, n, &triplets)?)
    }
}
