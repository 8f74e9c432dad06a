use std::collections::HashMap;

use crate::error::FemError;

/// Unstructured storage for a QUAD4 mesh. Cells list their corner points
/// counter-clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub points: Vec<[f64; 2]>,
    pub cells: Vec<[usize; 4]>,
}

impl Mesh {
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Corner coordinates of cell `c`.
    pub fn cell_points(&self, c: usize) -> [[f64; 2]; 4] {
        self.cells[c].map(|i| self.points[i])
    }

    /// Edges that belong to exactly one cell, as `(start, end)` point indices
    /// in the owning cell's orientation.
    pub fn boundary_edges(&self) -> Vec<(usize, usize)> {
        let mut count: HashMap<(usize, usize), usize> = HashMap::new();
        let mut order = Vec::new();
        for cell in &self.cells {
            for k in 0..4 {
                let (a, b) = (cell[k], cell[(k + 1) % 4]);
                let key = (a.min(b), a.max(b));
                let seen = count.entry(key).or_insert(0);
                if *seen == 0 {
                    order.push((a, b));
                }
                *seen += 1;
            }
        }
        order
            .into_iter()
            .filter(|&(a, b)| count[&(a.min(b), a.max(b))] == 1)
            .collect()
    }
}

/// Structured `nx × ny` QUAD4 mesh of `[0, lx] × [0, ly]`.
///
/// Point `(i, j)` (column `i` along x, row `j` along y) has index
/// `i * (ny + 1) + j`; cell `(i, j)` has index `i * ny + j`.
pub fn rectangle_mesh(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Mesh, FemError> {
    if nx == 0 || ny == 0 {
        return Err(FemError::InvalidProblem(format!(
            "mesh needs at least one cell per direction, got {nx}x{ny}"
        )));
    }
    if !(lx > 0.0 && ly > 0.0) {
        return Err(FemError::InvalidProblem(format!(
            "domain extents must be positive, got {lx}x{ly}"
        )));
    }

    let mut points = Vec::with_capacity((nx + 1) * (ny + 1));
    for i in 0..=nx {
        for j in 0..=ny {
            points.push([lx * i as f64 / nx as f64, ly * j as f64 / ny as f64]);
        }
    }

    let idx = |i: usize, j: usize| i * (ny + 1) + j;
    let mut cells = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            cells.push([idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1)]);
        }
    }

    Ok(Mesh { points, cells })
}
