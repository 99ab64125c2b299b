use std::collections::HashMap;

/// Caller-provided item identifier.
pub type ItemId = i64;

/// A pairing: two item IDs to be compared.
pub type Pair = (ItemId, ItemId);

/// One observed outcome: `winner` beat `loser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonRecord {
    pub winner: ItemId,
    pub loser: ItemId,
}

impl ComparisonRecord {
    pub fn new(winner: ItemId, loser: ItemId) -> Self {
        ComparisonRecord { winner, loser }
    }

    /// The unordered pair this record resolves, smaller ID first.
    pub fn unordered(&self) -> Pair {
        unordered(self.winner, self.loser)
    }
}

/// Canonical key for an unordered pair, smaller ID first.
pub fn unordered(a: ItemId, b: ItemId) -> Pair {
    if a <= b { (a, b) } else { (b, a) }
}

/// Maps between caller-provided IDs and internal 0..N indices.
///
/// Index order is the order of the IDs passed in, which is what the matrix
/// builder treats as "the current ordering" (the last index is the pinned
/// reference item in the gauge-fixed system).
#[derive(Debug, Clone)]
pub(crate) struct IdMap {
    ids: Vec<ItemId>,
    id_to_idx: HashMap<ItemId, usize>,
}

impl IdMap {
    pub fn from_ids(ids: &[ItemId]) -> Self {
        let mut id_to_idx = HashMap::with_capacity(ids.len());
        for (idx, &id) in ids.iter().enumerate() {
            let prev = id_to_idx.insert(id, idx);
            assert!(prev.is_none(), "Duplicate item ID: {}", id);
        }
        IdMap {
            ids: ids.to_vec(),
            id_to_idx,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn get(&self, id: ItemId) -> Option<usize> {
        self.id_to_idx.get(&id).copied()
    }

    pub fn to_idx(&self, id: ItemId) -> usize {
        *self.id_to_idx.get(&id)
            .unwrap_or_else(|| panic!("Unknown item ID: {}", id))
    }

    pub fn to_id(&self, idx: usize) -> ItemId {
        self.ids[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unordered_key_is_direction_free() {
        assert_eq!(unordered(3, 1), (1, 3));
        assert_eq!(unordered(1, 3), (1, 3));
        assert_eq!(ComparisonRecord::new(9, 2).unordered(), ComparisonRecord::new(2, 9).unordered());
    }

    #[test]
    fn test_id_map_round_trip() {
        let map = IdMap::from_ids(&[40, 10, 30]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.to_idx(10), 1);
        assert_eq!(map.to_id(2), 30);
        assert_eq!(map.get(99), None);
    }

    #[test]
    #[should_panic(expected = "Duplicate item ID")]
    fn test_id_map_rejects_duplicates() {
        let _ = IdMap::from_ids(&[1, 2, 1]);
    }

    #[test]
    #[should_panic(expected = "Unknown item ID")]
    fn test_id_map_unknown_id_panics() {
        let map = IdMap::from_ids(&[1, 2]);
        map.to_idx(7);
    }
}
