pub mod base;
pub mod bayesian;
pub mod chunked;
pub mod grid;
pub mod sequential;

pub use base::{OptimizationJob, OptimizationMethod};
pub use bayesian::{BayesianOptimizer, SearchOutcome, PENALTY};
pub use chunked::{validate_chunk_size, ChunkedOptimizer};
pub use grid::{exhaustive_search, GridSearchOptimizer, Scored};
pub use sequential::SequentialOptimizer;
