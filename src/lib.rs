// Three-level aggregation of workplace-accident statistics by sector code.
//
// The pipeline is batch-shaped: the loader cleans the flat source table,
// `hierarchy::build` sums it at fine/medium/coarse granularity and derives
// the ratio statistics plus the national baseline, and `lookup` answers
// point queries against the resulting immutable snapshot.
pub mod aggregate;
pub mod hierarchy;
pub mod loader;
pub mod lookup;
pub mod output;
pub mod stats;
pub mod types;
pub mod util;
