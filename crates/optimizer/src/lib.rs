//! Optimization advisor: ranks AI rule suggestions by confidence and applies
//! them to a segment atomically.

pub mod advisor;
pub mod heuristic;

pub use advisor::{OptimizationAdvisor, SuggestionProvider};
pub use heuristic::HeuristicSuggestionProvider;
