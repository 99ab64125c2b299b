/// The growing record of pairwise outcomes.
///
/// Append-only. Derived views (frequencies, resolved pairs, first-appearance
/// order) are kept up to date on every `record` so the pair selector can query
/// them without rescanning the log.
use std::collections::{HashMap, HashSet, VecDeque};

use nalgebra::DMatrix;

use crate::error::GraphError;
use crate::matrix::{AdjacencyMatrix, Representation, SparseMatrix};
use crate::types::{ComparisonRecord, IdMap, ItemId, Pair};

#[derive(Debug, Clone, Default)]
pub struct ComparisonGraph {
    /// Every record in insertion order, duplicates included.
    records: Vec<ComparisonRecord>,
    /// Appearances per item across all records.
    frequency: HashMap<ItemId, usize>,
    /// Items in the order they first appeared.
    appearance_order: Vec<ItemId>,
    /// Unordered pairs (smaller ID first) with at least one record.
    resolved: HashSet<Pair>,
}

impl ComparisonGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ComparisonRecord>) -> Result<Self, GraphError> {
        let mut graph = ComparisonGraph::new();
        for r in records {
            graph.record(r.winner, r.loser)?;
        }
        Ok(graph)
    }

    /// Append one observation. A repeated unordered pair is kept in the log but
    /// does not add a second edge to the ranking matrix.
    pub fn record(&mut self, winner: ItemId, loser: ItemId) -> Result<(), GraphError> {
        if winner == loser {
            return Err(GraphError::SelfComparison { item: winner });
        }

        let record = ComparisonRecord::new(winner, loser);
        for item in [winner, loser] {
            let count = self.frequency.entry(item).or_insert(0);
            if *count == 0 {
                self.appearance_order.push(item);
            }
            *count += 1;
        }
        self.resolved.insert(record.unordered());
        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[ComparisonRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Items with at least one record, ascending.
    pub fn seen_items(&self) -> Vec<ItemId> {
        let mut items = self.appearance_order.clone();
        items.sort_unstable();
        items
    }

    /// Items with at least one record, in order of first appearance.
    pub fn appearance_order(&self) -> &[ItemId] {
        &self.appearance_order
    }

    pub fn has_seen(&self, item: ItemId) -> bool {
        self.frequency.contains_key(&item)
    }

    /// How many records mention `item`.
    pub fn frequency(&self, item: ItemId) -> usize {
        self.frequency.get(&item).copied().unwrap_or(0)
    }

    /// True if `{a, b}` has a record in either direction.
    pub fn already_resolved(&self, a: ItemId, b: ItemId) -> bool {
        self.resolved.contains(&crate::types::unordered(a, b))
    }

    /// Number of distinct unordered pairs with a record.
    pub fn resolved_pair_count(&self) -> usize {
        self.resolved.len()
    }

    /// One record per unordered pair, the first one observed, in log order.
    pub fn unique_records(&self) -> Vec<ComparisonRecord> {
        let mut seen = HashSet::with_capacity(self.resolved.len());
        self.records.iter()
            .filter(|r| seen.insert(r.unordered()))
            .copied()
            .collect()
    }

    /// Connected components of the undirected comparison graph. Each component
    /// is sorted; components are ordered by their smallest item.
    pub fn components(&self) -> Vec<Vec<ItemId>> {
        let items = self.seen_items();
        let id_map = IdMap::from_ids(&items);
        let edges = self.resolved.iter().map(|&(a, b)| (id_map.to_idx(a), id_map.to_idx(b)));

        // `items` is ascending, so index order is ID order.
        connected_components(items.len(), edges)
            .into_iter()
            .map(|component| component.into_iter().map(|idx| id_map.to_id(idx)).collect())
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.components().len() <= 1
    }

    /// Win matrix over `seen_items()` (ascending), one edge per unordered pair.
    /// Returns the item ordering alongside the matrix.
    pub fn adjacency(&self, representation: Representation) -> (Vec<ItemId>, AdjacencyMatrix) {
        let items = self.seen_items();
        let id_map = IdMap::from_ids(&items);
        let n = items.len();
        let edges = self.unique_records()
            .into_iter()
            .map(|r| (id_map.to_idx(r.winner), id_map.to_idx(r.loser)));

        let matrix = match representation {
            Representation::Dense => {
                let mut dense = DMatrix::zeros(n, n);
                for (w, l) in edges {
                    dense[(w, l)] = 1.0;
                }
                AdjacencyMatrix::Dense(dense)
            }
            Representation::Sparse => {
                AdjacencyMatrix::Sparse(SparseMatrix::from_triplets(n, edges.map(|(w, l)| (w, l, 1.0))))
            }
        };
        (items, matrix)
    }
}

/// Connected components over indices `0..n`, treating each edge as undirected.
/// Each component is sorted; components are ordered by their smallest index.
pub(crate) fn connected_components(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Vec<Vec<usize>> {
    let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, j) in edges {
        neighbours[i].push(j);
        neighbours[j].push(i);
    }

    let mut visited = vec![false; n];
    let mut components = Vec::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(i) = queue.pop_front() {
            for &j in &neighbours[i] {
                if !visited[j] {
                    visited[j] = true;
                    component.push(j);
                    queue.push_back(j);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}
