//! Goal-directed path search over the lazily expanded link graph.

mod engine;
mod expander;
mod heuristic;

pub use engine::{SearchEngine, SearchOptions, SearchOutcome, SearchReport, SearchStats};
pub use expander::GraphExpander;
pub use heuristic::{cosine_similarity, distance, HeuristicEvaluator, ScoredPage};
