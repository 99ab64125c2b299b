/// Interactive ranking session.
///
/// Owns the comparison graph, the latest ranking, the pair selector and its
/// RNG. Every accepted comparison triggers a full recompute, so
/// `current_ranking()` always describes the graph as it stands.
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::engine::{RankConfig, RankEngine};
use crate::error::{GraphError, SessionError};
use crate::graph::ComparisonGraph;
use crate::pairing::{NextPair, PairSelector, SelectionState, SelectorConfig};
use crate::ranking::Ranking;
use crate::types::ItemId;

#[derive(Debug, Clone)]
pub struct Session {
    selector: PairSelector,
    graph: ComparisonGraph,
    engine: RankEngine,
    /// `None` until the first successful ranking, and after any failed one.
    ranking: Option<Ranking>,
    rng: SmallRng,
}

impl Session {
    /// Start with no comparisons. Panics if `universe` has duplicate IDs.
    pub fn new(
        universe: &[ItemId],
        rank_config: RankConfig,
        selector_config: SelectorConfig,
    ) -> Result<Self, SessionError> {
        Self::with_graph(universe, ComparisonGraph::new(), rank_config, selector_config)
    }

    /// Resume from an existing graph, typically a loaded log.
    ///
    /// Every item in `graph` must belong to `universe`. A graph that cannot be
    /// ranked yet (disconnected, say) is accepted; the session just starts
    /// without a ranking.
    pub fn with_graph(
        universe: &[ItemId],
        graph: ComparisonGraph,
        rank_config: RankConfig,
        selector_config: SelectorConfig,
    ) -> Result<Self, SessionError> {
        let selector = PairSelector::new(universe, selector_config);
        if let Some(item) = graph.seen_items().into_iter().find(|&item| !selector.contains(item)) {
            return Err(SessionError::UnknownItem { item });
        }

        let mut session = Session {
            selector,
            graph,
            engine: RankEngine::new(rank_config)?,
            ranking: None,
            rng: SmallRng::from_rng(&mut rand::rng()),
        };
        if let Err(err) = session.recompute() {
            tracing::warn!(error = %err, "Starting session without a ranking");
        }
        Ok(session)
    }

    /// Reseed the selector RNG, for reproducible sessions.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Record that `winner` beat `loser` and recompute the ranking.
    ///
    /// If the recompute fails the comparison is still recorded; the error is
    /// returned and `current_ranking()` is `None` until a later one succeeds.
    pub fn record_comparison(&mut self, winner: ItemId, loser: ItemId) -> Result<(), SessionError> {
        for item in [winner, loser] {
            if !self.selector.contains(item) {
                return Err(SessionError::UnknownItem { item });
            }
        }
        if winner == loser {
            return Err(GraphError::SelfComparison { item: winner }.into());
        }
        if self.graph.already_resolved(winner, loser) {
            return Err(SessionError::AlreadyResolved(winner, loser));
        }

        self.graph.record(winner, loser)?;
        self.recompute()
    }

    pub fn next_pair(&mut self) -> NextPair {
        self.selector.next_pair(&self.graph, self.ranking.as_ref(), &mut self.rng)
    }

    pub fn current_ranking(&self) -> Option<&Ranking> {
        self.ranking.as_ref()
    }

    pub fn state(&self) -> SelectionState {
        self.selector.state(&self.graph, self.ranking.as_ref())
    }

    pub fn graph(&self) -> &ComparisonGraph {
        &self.graph
    }

    pub fn universe(&self) -> &[ItemId] {
        self.selector.universe()
    }

    pub fn config(&self) -> &RankConfig {
        self.engine.config()
    }

    fn recompute(&mut self) -> Result<(), SessionError> {
        if self.graph.is_empty() {
            self.ranking = None;
            return Ok(());
        }
        match self.engine.rank_graph(&self.graph) {
            Ok(ranking) => {
                tracing::debug!(records = self.graph.len(), tiers = ranking.tiers().len(), "Ranking updated");
                self.ranking = Some(ranking);
                Ok(())
            }
            Err(err) => {
                self.ranking = None;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RankComputationError;
    use crate::persist::parse_comparisons;

    fn session(universe: &[ItemId]) -> Session {
        Session::new(universe, RankConfig::default(), SelectorConfig::default())
            .unwrap()
            .with_seed(42)
    }

    fn tier_items(ranking: &Ranking) -> Vec<Vec<ItemId>> {
        ranking.tiers().iter().map(|t| t.items.clone()).collect()
    }

    /// Judge every asked pair by ID (higher wins) until every pair is resolved.
    /// Returns the number of comparisons made.
    fn play_out(s: &mut Session) -> usize {
        let mut asked = 0;
        while let NextPair::Pair(a, b) = s.next_pair() {
            assert!(!s.graph().already_resolved(a, b), "re-asked ({a}, {b})");

            let has_unseen = s.universe().iter().any(|&item| !s.graph().has_seen(item));
            if has_unseen {
                assert!(
                    !s.graph().has_seen(a) || !s.graph().has_seen(b),
                    "({a}, {b}) skipped an unseen item"
                );
            }

            let (winner, loser) = if a > b { (a, b) } else { (b, a) };
            match s.record_comparison(winner, loser) {
                Ok(()) | Err(SessionError::Rank(RankComputationError::Disconnected { .. })) => {}
                Err(err) => panic!("unexpected error: {err}"),
            }
            asked += 1;
        }
        asked
    }

    #[test]
    fn test_transitive_chain() {
        let mut s = session(&[1, 2, 3]);
        s.record_comparison(1, 2).unwrap();
        s.record_comparison(2, 3).unwrap();
        assert_eq!(tier_items(s.current_ranking().unwrap()), vec![vec![1], vec![2], vec![3]]);

        assert_eq!(s.state(), SelectionState::FrequencyBalance);
        assert_eq!(s.next_pair(), NextPair::Pair(1, 3));

        s.record_comparison(1, 3).unwrap();
        assert_eq!(s.next_pair(), NextPair::Exhausted);
    }

    #[test]
    fn test_full_session_never_reasks_and_ends_ordered() {
        for seed in 0..5 {
            let universe = [4, 8, 15, 16, 23, 42];
            let mut s = session(&universe).with_seed(seed);
            let asked = play_out(&mut s);

            assert_eq!(asked, 15);
            assert_eq!(s.graph().resolved_pair_count(), 15);
            let ranking = s.current_ranking().unwrap();
            assert_eq!(
                tier_items(ranking),
                vec![vec![42], vec![23], vec![16], vec![15], vec![8], vec![4]]
            );
        }
    }

    #[test]
    fn test_regularized_session_plays_out() {
        let config = RankConfig { alpha: 0.5, ..RankConfig::default() };
        let mut s = Session::new(&[1, 2, 3, 4, 5], config, SelectorConfig::default())
            .unwrap()
            .with_seed(3);
        assert_eq!(play_out(&mut s), 10);
        assert!(s.current_ranking().is_some());
    }

    #[test]
    fn test_rejections_leave_graph_untouched() {
        let mut s = session(&[1, 2, 3]);
        s.record_comparison(1, 2).unwrap();

        assert_eq!(s.record_comparison(2, 1), Err(SessionError::AlreadyResolved(2, 1)));
        assert_eq!(s.record_comparison(1, 2), Err(SessionError::AlreadyResolved(1, 2)));
        assert_eq!(s.record_comparison(9, 1), Err(SessionError::UnknownItem { item: 9 }));
        assert_eq!(
            s.record_comparison(3, 3),
            Err(SessionError::Graph(GraphError::SelfComparison { item: 3 }))
        );
        assert_eq!(s.graph().len(), 1);
    }

    #[test]
    fn test_disconnected_record_kept_without_ranking() {
        let mut s = session(&[1, 2, 3, 4]);
        s.record_comparison(1, 2).unwrap();
        assert!(s.current_ranking().is_some());

        let err = s.record_comparison(3, 4).unwrap_err();
        assert_eq!(err, SessionError::Rank(RankComputationError::Disconnected { components: 2 }));
        assert_eq!(s.graph().len(), 2);
        assert!(s.current_ranking().is_none());

        assert_eq!(s.state(), SelectionState::ComponentBridge);
        assert_eq!(s.next_pair(), NextPair::Pair(1, 3));

        s.record_comparison(1, 3).unwrap();
        assert!(s.current_ranking().is_some());
    }

    #[test]
    fn test_resume_from_log() {
        let graph = parse_comparisons("1>2\n2>3\n").unwrap();
        let s = Session::with_graph(&[1, 2, 3, 4], graph, RankConfig::default(), SelectorConfig::default())
            .unwrap();
        assert_eq!(tier_items(s.current_ranking().unwrap()), vec![vec![1], vec![2], vec![3]]);
        assert_eq!(s.state(), SelectionState::UnseenPending);
    }

    #[test]
    fn test_resume_from_disconnected_log() {
        let graph = parse_comparisons("1>2\n3>4\n").unwrap();
        let s = Session::with_graph(&[1, 2, 3, 4], graph, RankConfig::default(), SelectorConfig::default())
            .unwrap();
        assert!(s.current_ranking().is_none());
        assert_eq!(s.graph().len(), 2);
    }

    #[test]
    fn test_resume_rejects_foreign_items() {
        let graph = parse_comparisons("1>7\n").unwrap();
        let err = Session::with_graph(&[1, 2], graph, RankConfig::default(), SelectorConfig::default())
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownItem { item: 7 });
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RankConfig { alpha: -1.0, ..RankConfig::default() };
        let err = Session::new(&[1, 2], config, SelectorConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::Rank(RankComputationError::InvalidParameter { name: "alpha", .. })));
    }

    #[test]
    fn test_empty_and_single_universe() {
        let mut empty = session(&[]);
        assert!(empty.next_pair().is_exhausted());
        assert!(empty.current_ranking().is_none());

        let mut single = session(&[5]);
        assert!(single.next_pair().is_exhausted());
    }
}
