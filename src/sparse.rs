//! Compressed sparse row matrices over any [`Scalar`].
//!
//! Finite-element Jacobians are assembled as triplets and compressed here.
//! Because the entry type is generic, the same assembly produces a plain
//! `CsrMatrix<f64>` for the linear solver, or a `CsrMatrix<Dual<f64>>`
//! whose tangent part is the directional derivative of the matrix, which is
//! what the tangent rule of a linear solve consumes.

use crate::error::{check_dim, DiffError};
use crate::linear::LinearMap;
use crate::Scalar;

/// Sparse matrix in CSR format. Column indices are sorted and unique within
/// each row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<S> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<S>,
}

impl<S: Scalar> CsrMatrix<S> {
    /// Build from `(row, col, value)` triplets. Duplicate positions are
    /// summed, matching finite-element assembly semantics.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, S)],
    ) -> Result<Self, DiffError> {
        let mut counts = vec![0usize; nrows + 1];
        for &(row, col, _) in triplets {
            if row >= nrows || col >= ncols {
                return Err(DiffError::IndexOutOfBounds {
                    row,
                    col,
                    nrows,
                    ncols,
                });
            }
            counts[row + 1] += 1;
        }
        for i in 0..nrows {
            counts[i + 1] += counts[i];
        }

        // Bucket by row, then sort each row by column and merge duplicates.
        let mut slots = counts.clone();
        let mut buckets: Vec<(usize, S)> = vec![(0, S::zero()); triplets.len()];
        for &(row, col, val) in triplets {
            buckets[slots[row]] = (col, val);
            slots[row] += 1;
        }

        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        row_ptr.push(0);
        for i in 0..nrows {
            let row = &mut buckets[counts[i]..counts[i + 1]];
            row.sort_by_key(|&(col, _)| col);
            for &(col, val) in row.iter() {
                match col_idx.last() {
                    Some(&last) if last == col && values.len() > row_ptr[i] => {
                        if let Some(acc) = values.last_mut() {
                            *acc += val;
                        }
                    }
                    _ => {
                        col_idx.push(col);
                        values.push(val);
                    }
                }
            }
            row_ptr.push(col_idx.len());
        }

        Ok(CsrMatrix {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// The `n × n` identity.
    pub fn identity(n: usize) -> Self {
        CsrMatrix {
            nrows: n,
            ncols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![S::one(); n],
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[S] {
        &self.values
    }

    /// Column indices and values of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[S]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Stored entry at `(i, j)`, or `None` outside the pattern.
    pub fn get(&self, i: usize, j: usize) -> Option<S> {
        if i >= self.nrows {
            return None;
        }
        let (cols, vals) = self.row(i);
        cols.binary_search(&j).ok().map(|k| vals[k])
    }

    /// Iterate over stored entries as `(row, col, value)`.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, S)> + '_ {
        (0..self.nrows).flat_map(move |i| {
            let (cols, vals) = self.row(i);
            cols.iter().zip(vals).map(move |(&j, &v)| (i, j, v))
        })
    }

    /// Same pattern, entries mapped through `f`.
    pub fn map<U>(&self, f: impl Fn(&S) -> U) -> CsrMatrix<U> {
        CsrMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            row_ptr: self.row_ptr.clone(),
            col_idx: self.col_idx.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Main diagonal (zero where the pattern has no diagonal entry).
    pub fn diagonal(&self) -> Vec<S> {
        (0..self.nrows.min(self.ncols))
            .map(|i| self.get(i, i).unwrap_or_else(S::zero))
            .collect()
    }

    /// `A x`. Panics in debug builds on a length mismatch.
    pub fn matvec(&self, x: &[S]) -> Vec<S> {
        debug_assert_eq!(x.len(), self.ncols);
        (0..self.nrows)
            .map(|i| {
                let (cols, vals) = self.row(i);
                let mut acc = S::zero();
                for (&j, &v) in cols.iter().zip(vals) {
                    acc += v * x[j];
                }
                acc
            })
            .collect()
    }

    /// `Aᵀ y` without forming the transpose.
    pub fn transpose_matvec(&self, y: &[S]) -> Vec<S> {
        debug_assert_eq!(y.len(), self.nrows);
        let mut out = vec![S::zero(); self.ncols];
        for (i, &yi) in y.iter().enumerate() {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                out[j] += v * yi;
            }
        }
        out
    }

    /// Explicit transpose, again in CSR with sorted rows.
    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.ncols + 1];
        for &j in &self.col_idx {
            counts[j + 1] += 1;
        }
        for j in 0..self.ncols {
            counts[j + 1] += counts[j];
        }
        let mut slots = counts.clone();
        let mut col_idx = vec![0usize; self.nnz()];
        let mut values = vec![S::zero(); self.nnz()];
        // Rows are visited in order, so each transposed row comes out sorted.
        for i in 0..self.nrows {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                col_idx[slots[j]] = i;
                values[slots[j]] = v;
                slots[j] += 1;
            }
        }
        CsrMatrix {
            nrows: self.ncols,
            ncols: self.nrows,
            row_ptr: counts,
            col_idx,
            values,
        }
    }
}

impl<S: Scalar> LinearMap<S> for CsrMatrix<S> {
    type Error = DiffError;

    fn input_dim(&self) -> usize {
        self.ncols
    }

    fn output_dim(&self) -> usize {
        self.nrows
    }

    fn apply(&self, x: &[S]) -> Result<Vec<S>, DiffError> {
        check_dim("matrix-vector input", self.ncols, x.len())?;
        Ok(self.matvec(x))
    }

    fn apply_transpose(&self, y: &[S]) -> Result<Vec<S>, DiffError> {
        check_dim("transposed matrix-vector input", self.nrows, y.len())?;
        Ok(self.transpose_matvec(y))
    }
}
