/// springpick-core: Spring-model ranking from sparse pairwise outcomes.
///
/// Comparison log → win matrix → spring linear system → scores → tiers, plus a
/// selector that proposes the next pair worth asking about. No IO beyond the
/// `BufRead`/`Write` log codec; bring your own judge.
///
/// Items are identified by caller-provided `i64` IDs. The crate handles the
/// mapping to matrix indices; callers never see indices.
///
/// # Quick start
///
/// ```rust
/// use springpick_core::{NextPair, RankConfig, SelectorConfig, Session};
///
/// let mut session = Session::new(&[10, 20, 30], RankConfig::default(), SelectorConfig::default())?;
///
/// session.record_comparison(10, 20)?;
/// session.record_comparison(20, 30)?;
///
/// let ranking = session.current_ranking().unwrap();
/// assert_eq!(ranking.tiers()[0].items, vec![10]);
///
/// match session.next_pair() {
///     NextPair::Pair(a, b) => println!("Ask about {a} vs {b}"),
///     NextPair::Exhausted => println!("Nothing left to ask"),
/// }
/// # Ok::<(), springpick_core::SessionError>(())
/// ```

pub mod builder;
pub mod constants;
pub mod engine;
pub mod error;
pub mod graph;
pub mod matrix;
pub mod pairing;
pub mod persist;
pub mod ranking;
pub mod session;
pub mod solver;
pub mod types;

// Re-export primary public API at crate root.
pub use engine::{RankConfig, RankEngine, RankVector};
pub use error::{GraphError, LoadError, RankComputationError, SessionError};
pub use graph::ComparisonGraph;
pub use matrix::{AdjacencyMatrix, Representation, SparseMatrix};
pub use pairing::{get_effective_state, NextPair, PairSelector, SelectionState, SelectorConfig};
pub use persist::{load_comparisons, parse_comparisons, save_comparisons, write_comparisons};
pub use ranking::{RankTier, Ranking};
pub use session::Session;
pub use solver::SolverKind;
pub use types::{ComparisonRecord, ItemId, Pair};
