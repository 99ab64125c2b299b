/// Square matrix representations used by the ranking system.
///
/// `SparseMatrix` stores one ordered map per row (column index -> value),
/// so rows iterate in column order and fill-in during elimination stays cheap.
/// Dense matrices are plain `nalgebra::DMatrix<f64>`.
use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::error::RankComputationError;

#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl SparseMatrix {
    pub fn zeros(n: usize) -> Self {
        SparseMatrix {
            n,
            rows: vec![BTreeMap::new(); n],
        }
    }

    /// Build from `(row, col, value)` triplets. Duplicate coordinates are summed.
    pub fn from_triplets(n: usize, triplets: impl IntoIterator<Item = (usize, usize, f64)>) -> Self {
        let mut m = SparseMatrix::zeros(n);
        for (i, j, v) in triplets {
            m.add(i, j, v);
        }
        m
    }

    pub fn from_dense(dense: &DMatrix<f64>) -> Self {
        assert_eq!(dense.nrows(), dense.ncols(), "SparseMatrix must be square");
        let n = dense.nrows();
        let mut m = SparseMatrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                let v = dense[(i, j)];
                if v != 0.0 {
                    m.rows[i].insert(j, v);
                }
            }
        }
        m
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n, self.n);
        for (i, j, v) in self.iter() {
            dense[(i, j)] = v;
        }
        dense
    }

    /// Number of rows (and columns).
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i].get(&j).copied().unwrap_or(0.0)
    }

    /// Set an entry; writing zero removes it.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.n && j < self.n, "index ({}, {}) out of range for {}x{} matrix", i, j, self.n, self.n);
        if value == 0.0 {
            self.rows[i].remove(&j);
        } else {
            self.rows[i].insert(j, value);
        }
    }

    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let current = self.get(i, j);
        self.set(i, j, current + value);
    }

    pub fn row(&self, i: usize) -> &BTreeMap<usize, f64> {
        &self.rows[i]
    }

    /// Iterate stored entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows.iter().enumerate().flat_map(|(i, row)| row.iter().map(move |(&j, &v)| (i, j, v)))
    }

    pub fn transpose(&self) -> Self {
        SparseMatrix::from_triplets(self.n, self.iter().map(|(i, j, v)| (j, i, v)))
    }

    /// `self + other`, entry-wise.
    pub fn plus(&self, other: &SparseMatrix) -> Self {
        assert_eq!(self.n, other.n, "dimension mismatch");
        let mut out = self.clone();
        for (i, j, v) in other.iter() {
            out.add(i, j, v);
        }
        out
    }

    pub fn negated(&self) -> Self {
        SparseMatrix {
            n: self.n,
            rows: self.rows.iter()
                .map(|row| row.iter().map(|(&j, &v)| (j, -v)).collect())
                .collect(),
        }
    }

    /// Sum of each row (`k_out` for a win matrix).
    pub fn row_sums(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.values().sum()).collect()
    }

    /// Sum of each column (`k_in` for a win matrix).
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n];
        for (_, j, v) in self.iter() {
            sums[j] += v;
        }
        sums
    }

    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.n, "vector length {} does not match matrix dimension {}", x.len(), self.n);
        self.rows.iter()
            .map(|row| row.iter().map(|(&j, &v)| v * x[j]).sum())
            .collect()
    }

    /// Take row `i` out of the matrix, leaving it empty.
    pub(crate) fn take_row(&mut self, i: usize) -> BTreeMap<usize, f64> {
        std::mem::take(&mut self.rows[i])
    }

    pub(crate) fn put_row(&mut self, i: usize, row: BTreeMap<usize, f64>) {
        self.rows[i] = row;
    }

    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        self.rows.swap(a, b);
    }
}

/// Storage used for the win matrix and the system built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Representation {
    Dense,
    #[default]
    Sparse,
}

/// A win-count matrix over some item ordering: entry (i, j) counts how often
/// item i beat item j.
#[derive(Debug, Clone, PartialEq)]
pub enum AdjacencyMatrix {
    Dense(DMatrix<f64>),
    Sparse(SparseMatrix),
}

impl AdjacencyMatrix {
    pub fn dim(&self) -> usize {
        match self {
            AdjacencyMatrix::Dense(m) => m.nrows(),
            AdjacencyMatrix::Sparse(m) => m.dim(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, AdjacencyMatrix::Sparse(_))
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self {
            AdjacencyMatrix::Dense(m) => m[(i, j)],
            AdjacencyMatrix::Sparse(m) => m.get(i, j),
        }
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            AdjacencyMatrix::Dense(m) => m.clone(),
            AdjacencyMatrix::Sparse(m) => m.to_dense(),
        }
    }

    pub fn to_sparse(&self) -> SparseMatrix {
        match self {
            AdjacencyMatrix::Dense(m) => SparseMatrix::from_dense(m),
            AdjacencyMatrix::Sparse(m) => m.clone(),
        }
    }

    /// Check the matrix is square with finite, non-negative counts and an empty diagonal.
    pub fn validate(&self) -> Result<(), RankComputationError> {
        let entries: Vec<(usize, usize, f64)> = match self {
            AdjacencyMatrix::Dense(m) => {
                if m.nrows() != m.ncols() {
                    return Err(RankComputationError::InvalidMatrix(format!(
                        "matrix is {}x{}, expected square", m.nrows(), m.ncols()
                    )));
                }
                let n = m.nrows();
                (0..n).flat_map(|i| (0..n).map(move |j| (i, j))).map(|(i, j)| (i, j, m[(i, j)])).collect()
            }
            AdjacencyMatrix::Sparse(m) => m.iter().collect(),
        };

        for (i, j, v) in entries {
            if !v.is_finite() || v < 0.0 {
                return Err(RankComputationError::InvalidMatrix(format!("entry ({i}, {j}) = {v} is not a non-negative count")));
            }
            if i == j && v != 0.0 {
                return Err(RankComputationError::InvalidMatrix(format!("self-comparison count {v} at ({i}, {i})")));
            }
        }
        Ok(())
    }
}
