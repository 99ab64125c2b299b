/// Linear system solvers for the spring model.
///
/// `Direct` factors the sparse matrix with Gaussian elimination (partial
/// pivoting, sparse rows) and is exact up to rounding. `Iterative` runs
/// BiCGSTAB, which only needs matrix-vector products and suits large sparse
/// systems, but its answer is approximate and carries a convergence flag.
use std::fmt;

use crate::constants::{CONVERGENCE_SLACK, DEFAULT_MIN_SOLVER_ITERATIONS, DEFAULT_SOLVER_TOLERANCE, PIVOT_TOLERANCE};
use crate::error::RankComputationError;
use crate::matrix::SparseMatrix;

/// Solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum SolverKind {
    /// Sparse LU factorization.
    Direct,
    /// Biconjugate-gradient-stabilized iteration.
    #[default]
    Iterative,
}

impl SolverKind {
    /// Parse a configured solver name. Unknown names log a warning and fall
    /// back to `Iterative`; this never fails.
    pub fn from_name(name: &str) -> SolverKind {
        match name.trim().to_ascii_lowercase().as_str() {
            "direct" | "spsolve" => SolverKind::Direct,
            "iterative" | "bicgstab" => SolverKind::Iterative,
            other => {
                tracing::warn!(solver = other, "Unknown solver name, falling back to \"iterative\"");
                SolverKind::Iterative
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Direct => "direct",
            SolverKind::Iterative => "iterative",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for SolverKind {
    fn from(name: String) -> Self {
        SolverKind::from_name(&name)
    }
}

impl From<SolverKind> for String {
    fn from(kind: SolverKind) -> Self {
        kind.name().to_string()
    }
}

/// Stopping rules for the iterative solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterativeOptions {
    /// Target relative residual `||B - Cx|| / ||B||`. Iteration stops on the
    /// recurrence residual; the result is reported converged if the true
    /// residual is within `CONVERGENCE_SLACK` times this target.
    pub tolerance: f64,
    /// Iteration cap. `None` = `max(100, 10 * n)`.
    pub max_iterations: Option<usize>,
}

impl Default for IterativeOptions {
    fn default() -> Self {
        IterativeOptions {
            tolerance: DEFAULT_SOLVER_TOLERANCE,
            max_iterations: None,
        }
    }
}

/// A solved system.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub x: Vec<f64>,
    /// False when BiCGSTAB hit its iteration cap or broke down before reaching
    /// the tolerance. `x` is then a best-effort approximation.
    pub converged: bool,
    pub iterations: usize,
    /// Final relative residual.
    pub residual: f64,
}

/// Solve `c * x = b` with the chosen method.
pub fn solve(
    c: &SparseMatrix,
    b: &[f64],
    kind: SolverKind,
    options: &IterativeOptions,
) -> Result<Solution, RankComputationError> {
    assert_eq!(c.dim(), b.len(), "right-hand side length does not match matrix dimension");

    let solution = match kind {
        SolverKind::Direct => solve_direct(c, b)?,
        SolverKind::Iterative => solve_bicgstab(c, b, options),
    };

    tracing::debug!(
        solver = %kind,
        n = c.dim(),
        nnz = c.nnz(),
        iterations = solution.iterations,
        residual = solution.residual,
        converged = solution.converged,
        "Solved spring system"
    );

    if !solution.converged {
        tracing::warn!(
            iterations = solution.iterations,
            residual = solution.residual,
            "Iterative solver did not converge; scores are approximate"
        );
    }

    Ok(solution)
}

/// Gaussian elimination with partial pivoting over sparse rows.
pub fn solve_direct(c: &SparseMatrix, b: &[f64]) -> Result<Solution, RankComputationError> {
    let n = c.dim();
    let mut lu = c.clone();
    let mut rhs = b.to_vec();

    let scale = c.iter().map(|(_, _, v)| v.abs()).fold(0.0_f64, f64::max);
    let pivot_floor = PIVOT_TOLERANCE * scale.max(1.0) * n.max(1) as f64;

    for k in 0..n {
        // Pivot: largest |entry| in column k at or below the diagonal.
        let mut pivot_row = k;
        let mut pivot_abs = lu.get(k, k).abs();
        for i in (k + 1)..n {
            let v = lu.get(i, k).abs();
            if v > pivot_abs {
                pivot_abs = v;
                pivot_row = i;
            }
        }
        if pivot_abs <= pivot_floor {
            return Err(RankComputationError::Singular { column: k });
        }
        if pivot_row != k {
            lu.swap_rows(k, pivot_row);
            rhs.swap(k, pivot_row);
        }

        let pivot_entries: Vec<(usize, f64)> = lu.row(k)
            .range(k..)
            .map(|(&j, &v)| (j, v))
            .collect();
        let pivot = pivot_entries[0].1;

        for i in (k + 1)..n {
            let below = lu.get(i, k);
            if below == 0.0 {
                continue;
            }
            let factor = below / pivot;
            let mut row = lu.take_row(i);
            row.remove(&k);
            for &(j, v) in &pivot_entries[1..] {
                let updated = row.get(&j).copied().unwrap_or(0.0) - factor * v;
                if updated == 0.0 {
                    row.remove(&j);
                } else {
                    row.insert(j, updated);
                }
            }
            lu.put_row(i, row);
            rhs[i] -= factor * rhs[k];
        }
    }

    // Back substitution on the upper-triangular factor.
    let mut x = vec![0.0; n];
    for k in (0..n).rev() {
        let mut acc = rhs[k];
        let mut diag = 0.0;
        for (&j, &v) in lu.row(k).range(k..) {
            if j == k {
                diag = v;
            } else {
                acc -= v * x[j];
            }
        }
        x[k] = acc / diag;
    }

    let residual = relative_residual(c, &x, b);
    Ok(Solution { x, converged: true, iterations: 0, residual })
}

/// Biconjugate gradient stabilized method, starting from zero.
pub fn solve_bicgstab(c: &SparseMatrix, b: &[f64], options: &IterativeOptions) -> Solution {
    let n = c.dim();
    let max_iterations = options.max_iterations
        .unwrap_or_else(|| (10 * n).max(DEFAULT_MIN_SOLVER_ITERATIONS));

    let b_norm = norm(b);
    let mut x = vec![0.0; n];
    if b_norm == 0.0 {
        return Solution { x, converged: true, iterations: 0, residual: 0.0 };
    }
    let target = options.tolerance * b_norm;

    let mut r = b.to_vec();
    let r_hat = r.clone();
    let mut p = vec![0.0; n];
    let mut v = vec![0.0; n];
    let (mut rho_prev, mut alpha, mut omega) = (1.0, 1.0, 1.0);

    for iteration in 1..=max_iterations {
        let rho = dot(&r_hat, &r);
        if rho == 0.0 {
            return finish(c, b, x, iteration - 1, target);
        }

        let beta = (rho / rho_prev) * (alpha / omega);
        for i in 0..n {
            p[i] = r[i] + beta * (p[i] - omega * v[i]);
        }
        v = c.mul_vec(&p);

        let r_hat_v = dot(&r_hat, &v);
        if r_hat_v == 0.0 {
            return finish(c, b, x, iteration - 1, target);
        }
        alpha = rho / r_hat_v;

        let s: Vec<f64> = r.iter().zip(&v).map(|(ri, vi)| ri - alpha * vi).collect();
        if norm(&s) <= target {
            for i in 0..n {
                x[i] += alpha * p[i];
            }
            return finish(c, b, x, iteration, target);
        }

        let t = c.mul_vec(&s);
        let t_t = dot(&t, &t);
        omega = if t_t == 0.0 { 0.0 } else { dot(&t, &s) / t_t };

        for i in 0..n {
            x[i] += alpha * p[i] + omega * s[i];
            r[i] = s[i] - omega * t[i];
        }

        if norm(&r) <= target || omega == 0.0 {
            return finish(c, b, x, iteration, target);
        }
        rho_prev = rho;
    }

    finish(c, b, x, max_iterations, target)
}

/// Judge convergence on the true residual, not the recurrence, allowing
/// `CONVERGENCE_SLACK` for rounding drift between the two.
fn finish(c: &SparseMatrix, b: &[f64], x: Vec<f64>, iterations: usize, target: f64) -> Solution {
    let b_norm = norm(b);
    let true_residual = norm(&subtract(b, &c.mul_vec(&x)));
    Solution {
        converged: true_residual <= target * CONVERGENCE_SLACK,
        residual: true_residual / b_norm,
        x,
        iterations,
    }
}

fn relative_residual(c: &SparseMatrix, x: &[f64], b: &[f64]) -> f64 {
    let b_norm = norm(b);
    let r = norm(&subtract(b, &c.mul_vec(x)));
    if b_norm == 0.0 { r } else { r / b_norm }
}

fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector};
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn diagonally_dominant(n: usize, rng: &mut SmallRng) -> SparseMatrix {
        let mut m = SparseMatrix::zeros(n);
        for i in 0..n {
            let mut off = 0.0;
            for j in 0..n {
                if i != j && rng.random::<f64>() < 0.3 {
                    let v = -rng.random_range(0.5..2.0);
                    m.set(i, j, v);
                    off += f64::abs(v);
                }
            }
            m.set(i, i, off + 1.0);
        }
        m
    }

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < tol, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_direct_matches_dense_lu() {
        let mut rng = SmallRng::seed_from_u64(3);
        let c = diagonally_dominant(12, &mut rng);
        let b: Vec<f64> = (0..12).map(|i| i as f64 - 5.0).collect();

        let ours = solve_direct(&c, &b).unwrap();
        let reference = c.to_dense().lu().solve(&DVector::from_column_slice(&b)).unwrap();

        assert!(ours.converged);
        assert_close(&ours.x, reference.as_slice(), 1e-10);
    }

    #[test]
    fn test_direct_needs_pivoting() {
        // Zero on the leading diagonal.
        let c = SparseMatrix::from_dense(&DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 1.0]));
        let sol = solve_direct(&c, &[2.0, 3.0]).unwrap();
        assert_close(&sol.x, &[1.0, 2.0], 1e-12);
    }

    #[test]
    fn test_direct_detects_singular() {
        let c = SparseMatrix::from_dense(&DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]));
        let err = solve_direct(&c, &[1.0, -1.0]).unwrap_err();
        assert_eq!(err, RankComputationError::Singular { column: 1 });
    }

    #[test]
    fn test_bicgstab_matches_direct() {
        let mut rng = SmallRng::seed_from_u64(5);
        for n in [1, 2, 5, 20, 40] {
            let c = diagonally_dominant(n, &mut rng);
            let b: Vec<f64> = (0..n).map(|_| rng.random_range(-3.0..3.0)).collect();

            let direct = solve_direct(&c, &b).unwrap();
            let iterative = solve_bicgstab(&c, &b, &IterativeOptions::default());

            assert!(iterative.converged, "n = {} did not converge", n);
            assert!(iterative.residual < 1e-8);
            assert_close(&iterative.x, &direct.x, 1e-7);
        }
    }

    #[test]
    fn test_bicgstab_zero_rhs() {
        let c = SparseMatrix::from_triplets(2, [(0, 0, 1.0), (1, 1, 1.0)]);
        let sol = solve_bicgstab(&c, &[0.0, 0.0], &IterativeOptions::default());
        assert!(sol.converged);
        assert_eq!(sol.x, vec![0.0, 0.0]);
    }

    #[test]
    fn test_bicgstab_reports_non_convergence() {
        let mut rng = SmallRng::seed_from_u64(9);
        let c = diagonally_dominant(30, &mut rng);
        // Rows of `c` sum to one, so a constant right-hand side would be solved
        // exactly in one step.
        let b: Vec<f64> = (0..30).map(|_| rng.random_range(-3.0..3.0)).collect();
        let sol = solve_bicgstab(&c, &b, &IterativeOptions { tolerance: 1e-14, max_iterations: Some(1) });
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 1);
    }

    #[test]
    fn test_convergence_allows_rounding_slack() {
        let c = SparseMatrix::from_triplets(1, [(0, 0, 1.0)]);
        let target = 1e-10;

        let within = finish(&c, &[1.0], vec![1.0 - 5e-10], 3, target);
        assert!(within.converged);
        assert!((within.residual - 5e-10).abs() < 1e-15);

        let outside = finish(&c, &[1.0], vec![1.0 - 2e-9], 3, target);
        assert!(!outside.converged);
    }

    #[test]
    fn test_solver_names() {
        assert_eq!(SolverKind::from_name("direct"), SolverKind::Direct);
        assert_eq!(SolverKind::from_name("spsolve"), SolverKind::Direct);
        assert_eq!(SolverKind::from_name("BiCGSTAB"), SolverKind::Iterative);
        assert_eq!(SolverKind::from_name("cholesky"), SolverKind::Iterative);
        assert_eq!(SolverKind::default(), SolverKind::Iterative);
    }
}
