//! Service layer: cross-cutting utilities used alongside the cache tiers.

pub mod profiler;

pub use profiler::{ProfilerStats, QueryBreakdown, QueryProfiler, QuerySample, QueryScope};
