pub mod dedup;
pub mod engine;
pub mod export;
pub mod io;
pub mod pool;
pub mod progress;
pub mod report;
pub mod rule;
pub mod sink;
pub mod source;
pub mod stats;

pub mod prelude {
    pub use crate::engine::{Engine, ExtractionReport, OperationError, ScanConfig};
    pub use crate::rule::{ExtractionRule, MatchCandidate};
    pub use crate::stats::AggregateStats;
}
