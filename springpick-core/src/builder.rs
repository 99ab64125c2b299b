/// Spring-model linear system construction.
///
/// Turns a directed win-count matrix A into `C x = B`, whose solution x places
/// every item on a line so that winners sit above the items they beat.
/// Internal module: operates on pre-mapped `usize` indices, not caller IDs.
///
/// Two forms:
///
/// - **Regularized** (`alpha > 0`): every item is pulled toward `l0` with
///   strength `alpha`. C is strictly diagonally dominant and always invertible.
/// - **Gauge-fixed** (`alpha == 0`): the Laplacian system is only rank n-1
///   (scores are defined up to a shared shift), so each equation is tied to the
///   last item's equation instead. Any solution of the plain system with
///   `x[n-1] == 0` solves the fixed one, so relative scores are exact.
///
/// Every form exists for dense and sparse inputs and both must agree.
use nalgebra::DMatrix;

use crate::matrix::SparseMatrix;

/// Parameters of the spring system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    /// Regularization strength, `>= 0`. Zero selects the gauge-fixed form.
    pub alpha: f64,
    /// Anchor value the regularized form pulls toward.
    pub l0: f64,
    /// Weight of the win/loss imbalance on the right-hand side.
    pub l1: f64,
}

/// `matrix * x = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem<M> {
    pub matrix: M,
    pub rhs: Vec<f64>,
}

/// Per-item degree terms shared by both forms.
struct Degrees {
    /// Times each item lost.
    k_in: Vec<f64>,
    /// Times each item won.
    k_out: Vec<f64>,
}

impl Degrees {
    fn total(&self) -> Vec<f64> {
        self.k_in.iter().zip(&self.k_out).map(|(i, o)| i + o).collect()
    }

    fn imbalance(&self, l1: f64) -> Vec<f64> {
        self.k_in.iter().zip(&self.k_out).map(|(i, o)| l1 * (o - i)).collect()
    }

    /// Right-hand side of the gauge-fixed form: `D2 + D3`.
    fn gauge_fixed_rhs(&self, l1: f64) -> Vec<f64> {
        let last = self.k_in.len() - 1;
        let d3 = l1 * (self.k_out[last] - self.k_in[last]);
        self.imbalance(l1).into_iter().map(|d2| d2 + d3).collect()
    }

    fn regularized_rhs(&self, params: &SpringParams) -> Vec<f64> {
        let anchor = params.alpha * params.l0;
        self.imbalance(params.l1).into_iter().map(|d2| anchor + d2).collect()
    }
}

pub fn build_from_dense(a: &DMatrix<f64>, params: &SpringParams) -> LinearSystem<DMatrix<f64>> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "count matrix must be square");
    if n == 0 {
        return LinearSystem { matrix: DMatrix::zeros(0, 0), rhs: Vec::new() };
    }

    let degrees = Degrees {
        // row_sum() sums the rows together, giving one total per column.
        k_in: a.row_sum().iter().copied().collect(),
        k_out: a.column_sum().iter().copied().collect(),
    };
    let d1 = degrees.total();

    if params.alpha != 0.0 {
        let mut c = -(a + a.transpose());
        for i in 0..n {
            c[(i, i)] += params.alpha + d1[i];
        }
        LinearSystem { matrix: c, rhs: degrees.regularized_rhs(params) }
    } else {
        let last = n - 1;
        let last_row_plus_col: Vec<f64> = (0..n).map(|j| a[(last, j)] + a[(j, last)]).collect();

        let mut m = a + a.transpose();
        for i in 0..n {
            for j in 0..n {
                m[(i, j)] += last_row_plus_col[j];
            }
        }

        let mut c = -m;
        for i in 0..n {
            c[(i, i)] += d1[i];
        }
        LinearSystem { matrix: c, rhs: degrees.gauge_fixed_rhs(params.l1) }
    }
}

pub fn build_from_sparse(a: &SparseMatrix, params: &SpringParams) -> LinearSystem<SparseMatrix> {
    let n = a.dim();
    if n == 0 {
        return LinearSystem { matrix: SparseMatrix::zeros(0), rhs: Vec::new() };
    }

    let degrees = Degrees {
        k_in: a.col_sums(),
        k_out: a.row_sums(),
    };
    let d1 = degrees.total();
    let symmetric = a.plus(&a.transpose());

    if params.alpha != 0.0 {
        let mut c = symmetric.negated();
        for i in 0..n {
            c.add(i, i, params.alpha + d1[i]);
        }
        LinearSystem { matrix: c, rhs: degrees.regularized_rhs(params) }
    } else {
        // Row n-1 of A + Aᵗ is exactly A[n-1, :] + A[:, n-1].
        let last_row_plus_col: Vec<(usize, f64)> = symmetric.row(n - 1)
            .iter()
            .map(|(&j, &v)| (j, v))
            .collect();

        let mut m = symmetric;
        for i in 0..n {
            for &(j, v) in &last_row_plus_col {
                m.add(i, j, v);
            }
        }

        let mut c = m.negated();
        for i in 0..n {
            c.add(i, i, d1[i]);
        }
        LinearSystem { matrix: c, rhs: degrees.gauge_fixed_rhs(params.l1) }
    }
}
