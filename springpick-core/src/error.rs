/// Error types for the ranking core.
use thiserror::Error;

use crate::types::ItemId;

/// Errors raised while appending to a [`ComparisonGraph`](crate::graph::ComparisonGraph).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An item cannot be compared with itself.
    #[error("item {item} cannot be compared with itself")]
    SelfComparison { item: ItemId },
}

/// Errors raised while loading a persisted comparison log.
///
/// A single bad line fails the whole load; nothing is partially applied.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: expected `winner>loser`, got {content:?}")]
    MissingSeparator { line: usize, content: String },

    #[error("line {line}: invalid item id {value:?}: {source}")]
    InvalidItem {
        line: usize,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("line {line}: {source}")]
    InvalidRecord {
        line: usize,
        #[source]
        source: GraphError,
    },

    #[error("failed to read comparison log: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while computing a ranking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankComputationError {
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The count matrix is not square, or has a negative or non-finite entry.
    #[error("invalid count matrix: {0}")]
    InvalidMatrix(String),

    /// The gauge-fixed system only pins one component; every other component
    /// floats freely and its scores are undefined.
    #[error("comparison graph has {components} disconnected components; the gauge-fixed system is singular (use alpha > 0 or compare across components)")]
    Disconnected { components: usize },

    #[error("linear system is singular (zero pivot at column {column})")]
    Singular { column: usize },

    #[error("solver produced a non-finite score at position {index}")]
    NonFinite { index: usize },
}

/// Errors raised by [`Session`](crate::session::Session) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("item {item} is not part of the item universe")]
    UnknownItem { item: ItemId },

    #[error("pair ({0}, {1}) has already been compared")]
    AlreadyResolved(ItemId, ItemId),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Invalid ranking configuration, or a recomputation failed. A comparison
    /// that triggered the failure stays recorded.
    #[error("ranking failed: {0}")]
    Rank(#[from] RankComputationError),
}
