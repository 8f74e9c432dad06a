//! Finite-element fixtures: a structured QUAD4 mesh, boundary data, a generic
//! cell-kernel assembler and two physics kernels. They reach the solver only
//! through [`Problem`](crate::Problem).

pub mod assembly;
pub mod elasticity;
pub mod mesh;
pub mod poisson;
pub mod quad4;

pub use assembly::{CellKernel, DirichletBc, FeProblem, NeumannBc};
pub use elasticity::{cantilever, Elasticity};
pub use mesh::{rectangle_mesh, Mesh};
pub use poisson::NonlinearPoisson;
pub use quad4::{CellGeometry, QuadPoint};
