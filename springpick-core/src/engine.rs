/// Ranking engine orchestrator.
///
/// Win matrix → spring system (dense or sparse) → solver → one score per item.
/// Pure computation: no IO, no state beyond the configuration.
use crate::builder::{build_from_dense, build_from_sparse, SpringParams};
use crate::constants::{DEFAULT_ALPHA, DEFAULT_L0, DEFAULT_L1, DEFAULT_SOLVER_TOLERANCE, DEFAULT_TIE_TOLERANCE};
use crate::error::RankComputationError;
use crate::graph::{connected_components, ComparisonGraph};
use crate::matrix::{AdjacencyMatrix, Representation, SparseMatrix};
use crate::ranking::Ranking;
use crate::solver::{solve, IterativeOptions, SolverKind};
use crate::types::ItemId;

/// Configuration for the ranking engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RankConfig {
    /// Regularization strength, `>= 0`. Zero = gauge-fixed (pin the last item).
    pub alpha: f64,
    /// Anchor value for the regularized form.
    pub l0: f64,
    /// Weight of win/loss imbalance.
    pub l1: f64,
    pub solver: SolverKind,
    pub representation: Representation,
    /// Adjacent scores within this distance share a tier.
    pub tie_tolerance: f64,
    /// BiCGSTAB relative residual target.
    pub tolerance: f64,
    /// BiCGSTAB iteration cap. `None` = `max(100, 10 * n)`.
    pub max_iterations: Option<usize>,
}

impl Default for RankConfig {
    fn default() -> Self {
        RankConfig {
            alpha: DEFAULT_ALPHA,
            l0: DEFAULT_L0,
            l1: DEFAULT_L1,
            solver: SolverKind::default(),
            representation: Representation::default(),
            tie_tolerance: DEFAULT_TIE_TOLERANCE,
            tolerance: DEFAULT_SOLVER_TOLERANCE,
            max_iterations: None,
        }
    }
}

impl RankConfig {
    pub fn validate(&self) -> Result<(), RankComputationError> {
        let invalid = |name, value, reason| Err(RankComputationError::InvalidParameter { name, value, reason });

        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return invalid("alpha", self.alpha, "must be finite and >= 0");
        }
        if !self.l0.is_finite() {
            return invalid("l0", self.l0, "must be finite");
        }
        if !self.l1.is_finite() {
            return invalid("l1", self.l1, "must be finite");
        }
        if !self.tie_tolerance.is_finite() || self.tie_tolerance < 0.0 {
            return invalid("tie_tolerance", self.tie_tolerance, "must be finite and >= 0");
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return invalid("tolerance", self.tolerance, "must be finite and > 0");
        }
        Ok(())
    }

    fn spring_params(&self) -> SpringParams {
        SpringParams { alpha: self.alpha, l0: self.l0, l1: self.l1 }
    }

    fn iterative_options(&self) -> IterativeOptions {
        IterativeOptions { tolerance: self.tolerance, max_iterations: self.max_iterations }
    }

    pub fn is_gauge_fixed(&self) -> bool {
        self.alpha == 0.0
    }
}

/// Raw engine output: one score per matrix row.
#[derive(Debug, Clone, PartialEq)]
pub struct RankVector {
    pub scores: Vec<f64>,
    /// False when the iterative solver stopped short of its tolerance.
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
}

#[derive(Debug, Clone)]
pub struct RankEngine {
    config: RankConfig,
}

impl RankEngine {
    pub fn new(config: RankConfig) -> Result<Self, RankComputationError> {
        config.validate()?;
        Ok(RankEngine { config })
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    /// Score every row of `adjacency`, in row order.
    ///
    /// The configured representation decides the build path; an input in the
    /// other representation is converted first.
    pub fn rank(&self, adjacency: &AdjacencyMatrix) -> Result<RankVector, RankComputationError> {
        adjacency.validate()?;
        let n = adjacency.dim();

        if self.config.is_gauge_fixed() {
            if n == 1 {
                // The pinned item is the whole system.
                return Ok(RankVector { scores: vec![0.0], converged: true, iterations: 0, residual: 0.0 });
            }
            let sparse = adjacency.to_sparse();
            let components = connected_components(n, sparse.iter().map(|(i, j, _)| (i, j))).len();
            if components > 1 {
                return Err(RankComputationError::Disconnected { components });
            }
        }

        let params = self.config.spring_params();
        let system = match self.config.representation {
            Representation::Dense => {
                let built = build_from_dense(&adjacency.to_dense(), &params);
                (SparseMatrix::from_dense(&built.matrix), built.rhs)
            }
            Representation::Sparse => {
                let built = match adjacency {
                    AdjacencyMatrix::Sparse(a) => build_from_sparse(a, &params),
                    AdjacencyMatrix::Dense(_) => build_from_sparse(&adjacency.to_sparse(), &params),
                };
                (built.matrix, built.rhs)
            }
        };

        let (c, b) = system;
        let solution = solve(&c, &b, self.config.solver, &self.config.iterative_options())?;

        if let Some(index) = solution.x.iter().position(|s| !s.is_finite()) {
            return Err(RankComputationError::NonFinite { index });
        }

        Ok(RankVector {
            scores: solution.x,
            converged: solution.converged,
            iterations: solution.iterations,
            residual: solution.residual,
        })
    }

    /// Score and tier `items`, where `items[i]` labels row `i` of `adjacency`.
    pub fn rank_items(&self, items: &[ItemId], adjacency: &AdjacencyMatrix) -> Result<Ranking, RankComputationError> {
        assert_eq!(items.len(), adjacency.dim(), "item list does not match matrix dimension");
        let vector = self.rank(adjacency)?;
        let scores = items.iter().copied().zip(vector.scores).collect();
        Ok(Ranking::from_scores(scores, self.config.tie_tolerance, vector.converged))
    }

    /// Rank every item that appears in `graph`.
    pub fn rank_graph(&self, graph: &ComparisonGraph) -> Result<Ranking, RankComputationError> {
        let (items, adjacency) = graph.adjacency(self.config.representation);
        self.rank_items(&items, &adjacency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComparisonRecord;
    use nalgebra::DMatrix;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn graph(records: &[(ItemId, ItemId)]) -> ComparisonGraph {
        ComparisonGraph::from_records(records.iter().map(|&(w, l)| ComparisonRecord::new(w, l))).unwrap()
    }

    fn engine(solver: SolverKind, representation: Representation, alpha: f64) -> RankEngine {
        RankEngine::new(RankConfig { solver, representation, alpha, ..RankConfig::default() }).unwrap()
    }

    fn all_engines(alpha: f64) -> Vec<RankEngine> {
        let mut engines = Vec::new();
        for solver in [SolverKind::Direct, SolverKind::Iterative] {
            for representation in [Representation::Dense, Representation::Sparse] {
                engines.push(engine(solver, representation, alpha));
            }
        }
        engines
    }

    fn tier_items(ranking: &Ranking) -> Vec<Vec<ItemId>> {
        ranking.tiers().iter().map(|t| t.items.clone()).collect()
    }

    /// Random connected tournament: a shuffled spanning path plus extra edges.
    fn random_connected(n: usize, extra: usize, rng: &mut SmallRng) -> ComparisonGraph {
        use rand::seq::SliceRandom;
        let mut order: Vec<ItemId> = (1..=n as ItemId).collect();
        order.shuffle(rng);
        let mut g = ComparisonGraph::new();
        for w in order.windows(2) {
            g.record(w[0], w[1]).unwrap();
        }
        for _ in 0..extra {
            let a = rng.random_range(1..=n as ItemId);
            let b = rng.random_range(1..=n as ItemId);
            if a != b && !g.already_resolved(a, b) {
                g.record(a, b).unwrap();
            }
        }
        g
    }

    #[test]
    fn test_transitive_chain() {
        // 1 beats 2, 2 beats 3, 1 beats 3.
        let g = graph(&[(1, 2), (2, 3), (1, 3)]);
        for e in all_engines(0.0) {
            let ranking = e.rank_graph(&g).unwrap();
            assert_eq!(tier_items(&ranking), vec![vec![1], vec![2], vec![3]]);

            let (s1, s2, s3) = (ranking.score(1).unwrap(), ranking.score(2).unwrap(), ranking.score(3).unwrap());
            assert!(s1 > s2 && s2 > s3);
            // Last item is pinned at zero; the rest solve exactly.
            assert!((s1 - 4.0 / 3.0).abs() < 1e-8);
            assert!((s2 - 2.0 / 3.0).abs() < 1e-8);
            assert!(s3.abs() < 1e-8);
        }
    }

    #[test]
    fn test_shared_losers_tie() {
        // 1 beats both 2 and 3; nothing separates 2 from 3.
        let g = graph(&[(1, 2), (1, 3)]);
        for e in all_engines(0.0) {
            let ranking = e.rank_graph(&g).unwrap();
            assert_eq!(tier_items(&ranking), vec![vec![1], vec![2, 3]]);
            assert!(ranking.has_ties());
        }
    }

    #[test]
    fn test_dense_and_sparse_paths_agree() {
        let mut rng = SmallRng::seed_from_u64(21);
        for trial in 0..10 {
            let g = random_connected(6 + trial, 10, &mut rng);
            for alpha in [0.0, 0.3] {
                let dense = engine(SolverKind::Direct, Representation::Dense, alpha).rank_graph(&g).unwrap();
                let sparse = engine(SolverKind::Direct, Representation::Sparse, alpha).rank_graph(&g).unwrap();
                for ((id_d, s_d), (id_s, s_s)) in dense.scores().iter().zip(sparse.scores()) {
                    assert_eq!(id_d, id_s);
                    assert!((s_d - s_s).abs() < 1e-9);
                }
                assert_eq!(tier_items(&dense), tier_items(&sparse));
            }
        }
    }

    #[test]
    fn test_direct_and_iterative_agree() {
        let mut rng = SmallRng::seed_from_u64(4);
        for trial in 0..10 {
            let g = random_connected(5 + 2 * trial, 15, &mut rng);
            let direct = engine(SolverKind::Direct, Representation::Sparse, 0.0).rank_graph(&g).unwrap();
            let iterative = engine(SolverKind::Iterative, Representation::Sparse, 0.0).rank_graph(&g).unwrap();
            assert!(!iterative.is_approximate());
            for ((_, a), (_, b)) in direct.scores().iter().zip(iterative.scores()) {
                assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_iteration_cap_marks_ranking_approximate() {
        let mut rng = SmallRng::seed_from_u64(13);
        let g = random_connected(12, 20, &mut rng);
        let capped = RankEngine::new(RankConfig {
            solver: SolverKind::Iterative,
            max_iterations: Some(1),
            ..RankConfig::default()
        }).unwrap();

        let ranking = capped.rank_graph(&g).unwrap();
        assert!(ranking.is_approximate());
        assert_eq!(ranking.len(), 12);

        let exact = engine(SolverKind::Iterative, Representation::Sparse, 0.0).rank_graph(&g).unwrap();
        assert!(!exact.is_approximate());
    }

    #[test]
    fn test_gauge_invariance() {
        // Re-pinning a different item (by moving it to the end of the ordering)
        // shifts every score by the same constant and leaves tiers unchanged.
        let mut rng = SmallRng::seed_from_u64(99);
        let e = engine(SolverKind::Direct, Representation::Dense, 0.0);
        for _ in 0..10 {
            let g = random_connected(7, 8, &mut rng);
            let (items, adjacency) = g.adjacency(Representation::Dense);
            let base = e.rank_items(&items, &adjacency).unwrap();

            // Move the first item to the end so it becomes the reference item.
            let n = items.len();
            let perm: Vec<usize> = (1..n).chain(std::iter::once(0)).collect();
            let dense = adjacency.to_dense();
            let permuted = DMatrix::from_fn(n, n, |i, j| dense[(perm[i], perm[j])]);
            let permuted_items: Vec<ItemId> = perm.iter().map(|&i| items[i]).collect();
            let repinned = e.rank_items(&permuted_items, &AdjacencyMatrix::Dense(permuted)).unwrap();

            let shift = repinned.score(items[0]).unwrap() - base.score(items[0]).unwrap();
            assert!(repinned.score(items[0]).unwrap().abs() < 1e-9);
            for &item in &items {
                let diff = repinned.score(item).unwrap() - base.score(item).unwrap();
                assert!((diff - shift).abs() < 1e-8);
            }
            assert_eq!(tier_items(&base), tier_items(&repinned));
        }
    }

    #[test]
    fn test_disconnected_gauge_fixed_is_an_error() {
        let g = graph(&[(1, 2), (3, 4)]);
        for e in all_engines(0.0) {
            assert_eq!(e.rank_graph(&g).unwrap_err(), RankComputationError::Disconnected { components: 2 });
        }
    }

    #[test]
    fn test_regularized_handles_disconnected() {
        let g = graph(&[(1, 2), (3, 4)]);
        for e in all_engines(0.5) {
            let ranking = e.rank_graph(&g).unwrap();
            // Mirror-image components land on the same two tiers.
            assert_eq!(tier_items(&ranking), vec![vec![1, 3], vec![2, 4]]);
            assert!(ranking.score(1).unwrap() > ranking.score(2).unwrap());
        }
    }

    #[test]
    fn test_regularized_pulls_toward_anchor() {
        let g = graph(&[(1, 2)]);
        let e = RankEngine::new(RankConfig {
            alpha: 1.0,
            l0: 10.0,
            solver: SolverKind::Direct,
            ..RankConfig::default()
        }).unwrap();
        let ranking = e.rank_graph(&g).unwrap();
        let (s1, s2) = (ranking.score(1).unwrap(), ranking.score(2).unwrap());
        // (alpha + 1) s1 - s2 = alpha*l0 + 1, -s1 + (alpha + 1) s2 = alpha*l0 - 1
        assert!((s1 - 31.0 / 3.0).abs() < 1e-9);
        assert!((s2 - 29.0 / 3.0).abs() < 1e-9);
        assert!(((s1 + s2) / 2.0 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_item_and_empty() {
        let e = engine(SolverKind::Direct, Representation::Sparse, 0.0);
        let one = e.rank(&AdjacencyMatrix::Sparse(SparseMatrix::zeros(1))).unwrap();
        assert_eq!(one.scores, vec![0.0]);

        let empty = e.rank_graph(&ComparisonGraph::new()).unwrap();
        assert!(empty.is_empty());
        assert!(empty.tiers().is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let bad_alpha = RankEngine::new(RankConfig { alpha: -1.0, ..RankConfig::default() });
        assert!(matches!(bad_alpha, Err(RankComputationError::InvalidParameter { name: "alpha", .. })));

        let bad_l0 = RankEngine::new(RankConfig { l0: f64::NAN, ..RankConfig::default() });
        assert!(matches!(bad_l0, Err(RankComputationError::InvalidParameter { name: "l0", .. })));
    }

    #[test]
    fn test_rejects_negative_counts() {
        let e = engine(SolverKind::Direct, Representation::Dense, 0.0);
        let a = AdjacencyMatrix::Dense(DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]));
        assert!(matches!(e.rank(&a), Err(RankComputationError::InvalidMatrix(_))));
    }

    #[test]
    fn test_isolated_row_is_disconnected() {
        // Item 4 has no comparisons at all.
        let a = AdjacencyMatrix::Sparse(SparseMatrix::from_triplets(5, [(0, 1, 1.0), (1, 2, 1.0), (3, 2, 1.0)]));
        let e = engine(SolverKind::Direct, Representation::Sparse, 0.0);
        assert_eq!(e.rank(&a).unwrap_err(), RankComputationError::Disconnected { components: 2 });
    }
}
