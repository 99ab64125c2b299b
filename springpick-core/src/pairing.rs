/// Next-pair selection.
///
/// Four states, checked in order:
///   1. UnseenPending: some item has never been compared. Introduce it.
///   2. ComponentBridge: everything is seen but the comparisons fall apart
///      into islands, so no ranking exists. Join the two smallest islands.
///   3. FrequencyBalance: the ranking has no ties. Compare the two items that
///      have been judged least often.
///   4. TieBreak: the ranking has tied items. Split the largest tie.
///
/// Whatever a state proposes, an already-compared pair is never returned:
/// the selector redraws random pairs a bounded number of times, then walks the
/// universe in order. `Exhausted` means no unresolved pair is left.
use rand::seq::index::sample;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::constants::DEFAULT_MAX_REDRAWS;
use crate::graph::ComparisonGraph;
use crate::ranking::Ranking;
use crate::types::{IdMap, ItemId, Pair};

/// Which rule produced (or would produce) the next pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionState {
    UnseenPending,
    ComponentBridge,
    FrequencyBalance,
    TieBreak,
}

/// Outcome of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NextPair {
    Pair(ItemId, ItemId),
    /// Every pair of the universe is resolved.
    Exhausted,
}

impl NextPair {
    pub fn pair(&self) -> Option<Pair> {
        match *self {
            NextPair::Pair(a, b) => Some((a, b)),
            NextPair::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, NextPair::Exhausted)
    }
}

/// Configuration for the pair selector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SelectorConfig {
    /// Random redraws allowed after the state's own choice was already resolved,
    /// before falling back to an ordered scan.
    pub max_redraws: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig { max_redraws: DEFAULT_MAX_REDRAWS }
    }
}

/// Determine which selection rule applies.
///
/// `ranking` must describe `graph` as it is now; `None` means no ranking
/// could be computed for it.
pub fn get_effective_state(
    universe: &[ItemId],
    graph: &ComparisonGraph,
    ranking: Option<&Ranking>,
) -> SelectionState {
    if universe.iter().any(|&item| !graph.has_seen(item)) {
        return SelectionState::UnseenPending;
    }

    match ranking {
        Some(r) if r.has_ties() => SelectionState::TieBreak,
        Some(_) => SelectionState::FrequencyBalance,
        None if !graph.is_connected() => SelectionState::ComponentBridge,
        None => SelectionState::FrequencyBalance,
    }
}

#[derive(Debug, Clone)]
pub struct PairSelector {
    /// The full, fixed item universe, in caller order.
    items: IdMap,
    config: SelectorConfig,
}

impl PairSelector {
    pub fn new(universe: &[ItemId], config: SelectorConfig) -> Self {
        PairSelector {
            items: IdMap::from_ids(universe),
            config,
        }
    }

    pub fn universe(&self) -> &[ItemId] {
        self.items.ids()
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.items.get(item).is_some()
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Number of unordered pairs in the universe.
    pub fn total_pairs(&self) -> usize {
        let n = self.items.len();
        n * n.saturating_sub(1) / 2
    }

    pub fn state(&self, graph: &ComparisonGraph, ranking: Option<&Ranking>) -> SelectionState {
        get_effective_state(self.universe(), graph, ranking)
    }

    /// Choose the next pair to compare. Never returns a resolved pair.
    pub fn next_pair(
        &self,
        graph: &ComparisonGraph,
        ranking: Option<&Ranking>,
        rng: &mut impl Rng,
    ) -> NextPair {
        if self.items.len() < 2 || graph.resolved_pair_count() >= self.total_pairs() {
            return NextPair::Exhausted;
        }

        let state = self.state(graph, ranking);
        let candidate = match state {
            SelectionState::UnseenPending => self.pick_unseen(graph, rng),
            SelectionState::ComponentBridge => pick_bridge(graph),
            SelectionState::FrequencyBalance => self.pick_least_frequent(graph),
            SelectionState::TieBreak => ranking.and_then(pick_tie_break),
        };

        tracing::debug!(?state, ?candidate, "Pair selection");

        match candidate {
            Some((a, b)) if a != b && !graph.already_resolved(a, b) => NextPair::Pair(a, b),
            _ => self.redraw(graph, rng),
        }
    }

    /// Two unseen items, or the last unseen item and a random seen one.
    fn pick_unseen(&self, graph: &ComparisonGraph, rng: &mut impl Rng) -> Option<Pair> {
        let (unseen, seen): (Vec<ItemId>, Vec<ItemId>) = self.universe().iter()
            .copied()
            .partition(|&item| !graph.has_seen(item));

        tracing::debug!(?unseen, "Items not yet compared");

        if unseen.len() >= 2 {
            let picked = sample(rng, unseen.len(), 2);
            Some((unseen[picked.index(0)], unseen[picked.index(1)]))
        } else {
            let lone = *unseen.first()?;
            let partner = *seen.choose(rng)?;
            Some((lone, partner))
        }
    }

    /// The two items with the fewest appearances; ties go to whichever
    /// appeared first in the log.
    fn pick_least_frequent(&self, graph: &ComparisonGraph) -> Option<Pair> {
        let mut by_frequency: Vec<ItemId> = graph.appearance_order()
            .iter()
            .copied()
            .filter(|&item| self.contains(item))
            .collect();
        by_frequency.sort_by_key(|&item| graph.frequency(item));

        match by_frequency.as_slice() {
            [a, b, ..] => Some((*a, *b)),
            _ => None,
        }
    }

    /// Random redraws first; once the budget is spent, walk the universe
    /// pairs in order. `Exhausted` only when the walk finds nothing.
    fn redraw(&self, graph: &ComparisonGraph, rng: &mut impl Rng) -> NextPair {
        for _ in 0..self.config.max_redraws {
            let picked = sample(rng, self.items.len(), 2);
            let (a, b) = (self.items.to_id(picked.index(0)), self.items.to_id(picked.index(1)));
            if !graph.already_resolved(a, b) {
                tracing::debug!(a, b, "Redrew an unresolved pair");
                return NextPair::Pair(a, b);
            }
        }

        match self.first_unresolved(graph) {
            Some((a, b)) => {
                tracing::debug!(
                    max_redraws = self.config.max_redraws,
                    a,
                    b,
                    "Redraw budget spent; took the first unresolved pair in universe order"
                );
                NextPair::Pair(a, b)
            }
            None => NextPair::Exhausted,
        }
    }

    fn first_unresolved(&self, graph: &ComparisonGraph) -> Option<Pair> {
        let ids = self.universe();
        ids.iter().enumerate().find_map(|(i, &a)| {
            ids[i + 1..]
                .iter()
                .find(|&&b| !graph.already_resolved(a, b))
                .map(|&b| (a, b))
        })
    }
}

/// Least-frequent item of the smallest component against the least-frequent
/// item of the next smallest.
fn pick_bridge(graph: &ComparisonGraph) -> Option<Pair> {
    let mut components = graph.components();
    // Stable: equal sizes stay ordered by smallest member.
    components.sort_by_key(|c| c.len());

    let least_frequent = |component: &Vec<ItemId>| {
        component.iter().copied().min_by_key(|&item| (graph.frequency(item), item))
    };

    match components.as_slice() {
        [first, second, ..] => Some((least_frequent(first)?, least_frequent(second)?)),
        _ => None,
    }
}

/// First two members of the largest tier; if even that tier is a singleton,
/// the heads of the top two tiers.
fn pick_tie_break(ranking: &Ranking) -> Option<Pair> {
    let largest = ranking.largest_tier()?;
    if largest.len() >= 2 {
        return Some((largest.items[0], largest.items[1]));
    }
    let tiers = ranking.tiers();
    match tiers {
        [top, second, ..] => Some((top.items[0], second.items[0])),
        _ => None,
    }
}
