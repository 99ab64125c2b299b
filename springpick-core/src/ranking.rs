/// Score aggregation: per-item scores → ordered tiers.
use std::fmt;

use crate::types::ItemId;

/// Items whose scores are equal within the tie tolerance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankTier {
    /// Members, ascending by ID.
    pub items: Vec<ItemId>,
    /// Highest score in the tier.
    pub score: f64,
}

impl RankTier {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_tied(&self) -> bool {
        self.items.len() > 1
    }
}

/// A computed ranking.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ranking {
    /// `(item, score)` in the order the engine was given the items.
    scores: Vec<(ItemId, f64)>,
    /// Canonical ranking: tiers by score, best first.
    tiers: Vec<RankTier>,
    /// Indices into `tiers`, largest tier first.
    by_size: Vec<usize>,
    /// False when the iterative solver stopped short of its tolerance.
    converged: bool,
}

impl Ranking {
    /// Group scores into tiers. `scores` may be in any order.
    pub fn from_scores(scores: Vec<(ItemId, f64)>, tie_tolerance: f64, converged: bool) -> Self {
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let mut tiers: Vec<RankTier> = Vec::new();
        let mut last_score = f64::NAN;
        for (item, score) in sorted {
            // NaN on the first item, so it always opens a tier.
            if (last_score - score).abs() <= tie_tolerance {
                if let Some(tier) = tiers.last_mut() {
                    tier.items.push(item);
                }
            } else {
                tiers.push(RankTier { items: vec![item], score });
            }
            last_score = score;
        }
        for tier in &mut tiers {
            tier.items.sort_unstable();
        }

        // Stable: equal-sized tiers keep their score order.
        let mut by_size: Vec<usize> = (0..tiers.len()).collect();
        by_size.sort_by(|&a, &b| tiers[b].len().cmp(&tiers[a].len()));

        Ranking { scores, tiers, by_size, converged }
    }

    /// Tiers ordered by score, best first.
    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }

    /// Tiers ordered by size, largest first. Only the tie-breaking pair
    /// selection looks at this view.
    pub fn tiers_by_size(&self) -> impl Iterator<Item = &RankTier> + '_ {
        self.by_size.iter().map(move |&i| &self.tiers[i])
    }

    pub fn largest_tier(&self) -> Option<&RankTier> {
        self.tiers_by_size().next()
    }

    pub fn has_ties(&self) -> bool {
        self.tiers.iter().any(RankTier::is_tied)
    }

    /// Raw scores in engine input order.
    pub fn scores(&self) -> &[(ItemId, f64)] {
        &self.scores
    }

    pub fn score(&self, item: ItemId) -> Option<f64> {
        self.scores.iter().find(|(id, _)| *id == item).map(|&(_, s)| s)
    }

    /// Zero-based tier position of `item`.
    pub fn tier_of(&self, item: ItemId) -> Option<usize> {
        self.tiers.iter().position(|t| t.items.contains(&item))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// True when the scores came from a solver run that did not converge.
    pub fn is_approximate(&self) -> bool {
        !self.converged
    }

    /// One line per tier: `"{position})\t{item}\t{item}..."`.
    pub fn to_lines(&self) -> Vec<String> {
        self.tiers.iter().enumerate().map(|(i, tier)| {
            let members: Vec<String> = tier.items.iter().map(|id| id.to_string()).collect();
            format!("{})\t{}", i, members.join("\t"))
        }).collect()
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
