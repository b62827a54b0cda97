//! Scoped query profiling with aggregate statistics.
//!
//! Wrap any data-access scope in [`QueryProfiler::profile`]; the returned
//! guard records exactly one sample when it drops, on every exit path,
//! including early returns and panics. Samples over the slow threshold
//! log a warning. Used alongside the cache tiers to measure how much a
//! warm cache actually buys per tick.
//!
//! # Example
//! ```
//! use chatswarm::services::QueryProfiler;
//!
//! let profiler = QueryProfiler::new();
//! {
//!     let _scope = profiler.profile("load_recent_messages");
//!     // ... query work ...
//! }
//! assert_eq!(profiler.stats().total_queries, 1);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::domain::models::ProfilerConfig;

/// Default threshold above which a sample logs a warning.
pub const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(100);

/// How many entries `slowest_queries` keeps.
const SLOWEST_QUERIES_LIMIT: usize = 10;

/// One recorded profiling sample.
///
/// Durations are seconds; timestamps are seconds since the profiler was
/// constructed (monotonic clock, consistent within one run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySample {
    /// Name passed to [`QueryProfiler::profile`]
    pub name: String,
    /// Scope duration in seconds
    pub duration: f64,
    /// Scope start, seconds since profiler construction
    pub timestamp: f64,
}

/// Aggregate statistics for one query name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryBreakdown {
    /// Number of samples recorded under this name
    pub count: u64,
    /// Sum of durations in seconds
    pub total_time: f64,
    /// Mean duration in seconds
    pub avg_time: f64,
    /// Shortest sample in seconds
    pub min_time: f64,
    /// Longest sample in seconds
    pub max_time: f64,
}

/// Full profiler statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilerStats {
    /// Total samples recorded
    pub total_queries: u64,
    /// Distinct query names seen
    pub unique_queries: u64,
    /// Per-name aggregates
    pub query_breakdown: HashMap<String, QueryBreakdown>,
    /// Top samples by duration, descending, at most ten
    pub slowest_queries: Vec<QuerySample>,
}

#[derive(Serialize)]
struct ProfilerReport {
    total_queries: u64,
    unique_queries: u64,
    query_breakdown: HashMap<String, QueryBreakdown>,
    slowest_queries: Vec<QuerySample>,
    all_queries: Vec<QuerySample>,
}

#[derive(Default)]
struct ProfilerState {
    samples: Vec<QuerySample>,
    durations_by_name: HashMap<String, Vec<f64>>,
}

struct ProfilerShared {
    epoch: Instant,
    slow_threshold: Duration,
    state: Mutex<ProfilerState>,
}

/// Scoped timing profiler for query-like operations.
///
/// Cloning is cheap and shares the underlying sample log, so one profiler
/// can be threaded through workers explicitly (no ambient global state).
/// Aggregates sit behind a plain mutex so the scope guard can record from
/// `Drop` without an async context; critical sections are a push and a
/// map update.
#[derive(Clone)]
pub struct QueryProfiler {
    shared: Arc<ProfilerShared>,
}

impl Default for QueryProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryProfiler {
    /// Create a profiler with the default 100 ms slow-query threshold.
    pub fn new() -> Self {
        Self::with_slow_threshold(DEFAULT_SLOW_QUERY_THRESHOLD)
    }

    /// Create a profiler warning on samples longer than `slow_threshold`.
    pub fn with_slow_threshold(slow_threshold: Duration) -> Self {
        Self {
            shared: Arc::new(ProfilerShared {
                epoch: Instant::now(),
                slow_threshold,
                state: Mutex::new(ProfilerState::default()),
            }),
        }
    }

    /// Create a profiler from configuration.
    pub fn from_config(config: &ProfilerConfig) -> Self {
        Self::with_slow_threshold(Duration::from_millis(config.slow_query_threshold_ms))
    }

    /// Open a timing scope. The sample is recorded when the guard drops.
    #[must_use = "the scope records its sample on drop; binding it to _ drops immediately"]
    pub fn profile(&self, name: impl Into<String>) -> QueryScope {
        QueryScope {
            shared: Arc::clone(&self.shared),
            name: Some(name.into()),
            started: Instant::now(),
        }
    }

    /// Snapshot aggregate statistics.
    pub fn stats(&self) -> ProfilerStats {
        let state = self.lock();

        let query_breakdown = state
            .durations_by_name
            .iter()
            .map(|(name, durations)| (name.clone(), breakdown(durations)))
            .collect();

        let mut slowest: Vec<QuerySample> = state.samples.clone();
        slowest.sort_by(|a, b| {
            b.duration
                .partial_cmp(&a.duration)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        slowest.truncate(SLOWEST_QUERIES_LIMIT);

        ProfilerStats {
            total_queries: state.samples.len() as u64,
            unique_queries: state.durations_by_name.len() as u64,
            query_breakdown,
            slowest_queries: slowest,
        }
    }

    /// Render the textual report: `[Summary]`, `[Query Breakdown]` sorted
    /// by total time descending, and `[Top 10 Slowest Queries]`.
    pub fn render_report(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();

        let _ = writeln!(out, "[Summary]");
        let _ = writeln!(out, "Total queries: {}", stats.total_queries);
        let _ = writeln!(out, "Unique queries: {}", stats.unique_queries);

        let _ = writeln!(out, "\n[Query Breakdown]");
        let mut by_total: Vec<(&String, &QueryBreakdown)> = stats.query_breakdown.iter().collect();
        by_total.sort_by(|a, b| {
            b.1.total_time
                .partial_cmp(&a.1.total_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (name, entry) in by_total {
            let _ = writeln!(
                out,
                "{name}: count={} total={:.3}s avg={:.3}s min={:.3}s max={:.3}s",
                entry.count, entry.total_time, entry.avg_time, entry.min_time, entry.max_time
            );
        }

        let _ = writeln!(out, "\n[Top 10 Slowest Queries]");
        for (i, sample) in stats.slowest_queries.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} - {:.3}s (at {:.3}s)",
                i + 1,
                sample.name,
                sample.duration,
                sample.timestamp
            );
        }

        out
    }

    /// Print the textual report to stdout.
    pub fn print_report(&self) {
        println!("{}", self.render_report());
    }

    /// Persist the full statistics plus the raw sample log as pretty JSON.
    pub fn save_report(&self, path: impl AsRef<Path>) -> Result<()> {
        let stats = self.stats();
        let all_queries = self.lock().samples.clone();
        let report = ProfilerReport {
            total_queries: stats.total_queries,
            unique_queries: stats.unique_queries,
            query_breakdown: stats.query_breakdown,
            slowest_queries: stats.slowest_queries,
            all_queries,
        };

        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write report to {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Clear all samples and aggregates.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.samples.clear();
        state.durations_by_name.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProfilerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn breakdown(durations: &[f64]) -> QueryBreakdown {
    let count = durations.len() as u64;
    let total_time: f64 = durations.iter().sum();
    let min_time = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let max_time = durations.iter().copied().fold(0.0_f64, f64::max);
    #[allow(clippy::cast_precision_loss)]
    let avg_time = if count == 0 { 0.0 } else { total_time / count as f64 };
    QueryBreakdown {
        count,
        total_time,
        avg_time,
        min_time: if min_time.is_finite() { min_time } else { 0.0 },
        max_time,
    }
}

/// Guard for one profiled scope.
///
/// Records its sample exactly once, when dropped. Safe to drop from any
/// thread; concurrent drops serialize on the profiler's internal mutex.
pub struct QueryScope {
    shared: Arc<ProfilerShared>,
    name: Option<String>,
    started: Instant,
}

impl Drop for QueryScope {
    fn drop(&mut self) {
        let Some(name) = self.name.take() else {
            return;
        };
        let duration = self.started.elapsed();
        let duration_s = duration.as_secs_f64();

        if duration > self.shared.slow_threshold {
            warn!(query = %name, "slow query detected: {duration_s:.3}s");
        }

        let timestamp = self
            .started
            .saturating_duration_since(self.shared.epoch)
            .as_secs_f64();

        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state
            .durations_by_name
            .entry(name.clone())
            .or_default()
            .push(duration_s);
        state.samples.push(QuerySample {
            name,
            duration: duration_s,
            timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_scope_records_on_drop() {
        let profiler = QueryProfiler::new();
        {
            let _scope = profiler.profile("q");
        }
        let stats = profiler.stats();
        assert_eq!(stats.total_queries, 1);
        assert_eq!(stats.unique_queries, 1);
        assert_eq!(stats.query_breakdown["q"].count, 1);
    }

    #[test]
    fn test_scope_records_on_panic_path() {
        let profiler = QueryProfiler::new();
        let clone = profiler.clone();
        let result = std::panic::catch_unwind(move || {
            let _scope = clone.profile("exploding");
            panic!("query failed");
        });
        assert!(result.is_err());
        assert_eq!(profiler.stats().total_queries, 1);
    }

    #[test]
    fn test_aggregation_min_max_avg() {
        let profiler = QueryProfiler::new();
        {
            let _scope = profiler.profile("q");
            thread::sleep(Duration::from_millis(10));
        }
        {
            let _scope = profiler.profile("q");
            thread::sleep(Duration::from_millis(50));
        }

        let stats = profiler.stats();
        assert_eq!(stats.total_queries, 2);
        let entry = &stats.query_breakdown["q"];
        assert_eq!(entry.count, 2);
        assert!(entry.min_time >= 0.010);
        assert!(entry.max_time >= 0.050);
        assert!(entry.min_time <= entry.avg_time && entry.avg_time <= entry.max_time);
        assert!((entry.total_time - (entry.min_time + entry.max_time)).abs() < 1e-9);
        assert_eq!(stats.slowest_queries[0].name, "q");
        assert!(stats.slowest_queries[0].duration >= stats.slowest_queries[1].duration);
    }

    #[test]
    fn test_totality_across_names() {
        let profiler = QueryProfiler::new();
        for name in ["a", "b", "a", "c", "a", "b"] {
            let _scope = profiler.profile(name);
        }

        let stats = profiler.stats();
        assert_eq!(stats.total_queries, 6);
        assert_eq!(stats.unique_queries, 3);
        let count_sum: u64 = stats.query_breakdown.values().map(|b| b.count).sum();
        assert_eq!(count_sum, stats.total_queries);

        let total_sum: f64 = stats.query_breakdown.values().map(|b| b.total_time).sum();
        let sample_sum: f64 = profiler.lock().samples.iter().map(|s| s.duration).sum();
        assert!((total_sum - sample_sum).abs() < 1e-9);
    }

    #[test]
    fn test_slowest_queries_capped_at_ten() {
        let profiler = QueryProfiler::new();
        for i in 0..15 {
            let _scope = profiler.profile(format!("q{i}"));
        }
        assert_eq!(profiler.stats().slowest_queries.len(), 10);
    }

    #[test]
    fn test_reset() {
        let profiler = QueryProfiler::new();
        let _ = profiler.profile("q");
        profiler.reset();

        let stats = profiler.stats();
        assert_eq!(stats.total_queries, 0);
        assert_eq!(stats.unique_queries, 0);
        assert!(stats.query_breakdown.is_empty());
        assert!(stats.slowest_queries.is_empty());
    }

    #[test]
    fn test_report_sections_and_order() {
        let profiler = QueryProfiler::new();
        {
            let _scope = profiler.profile("slow_name");
            thread::sleep(Duration::from_millis(20));
        }
        {
            let _scope = profiler.profile("fast_name");
        }

        let report = profiler.render_report();
        let summary_pos = report.find("[Summary]").unwrap();
        let breakdown_pos = report.find("[Query Breakdown]").unwrap();
        let slowest_pos = report.find("[Top 10 Slowest Queries]").unwrap();
        assert!(summary_pos < breakdown_pos && breakdown_pos < slowest_pos);

        // breakdown is sorted by total time descending
        let slow = report.find("slow_name").unwrap();
        let fast = report.find("fast_name").unwrap();
        assert!(slow < fast);
        assert!(report.contains("Total queries: 2"));
        assert!(report.contains("1. slow_name"));
    }

    #[test]
    fn test_save_report_json_shape() {
        let profiler = QueryProfiler::new();
        {
            let _scope = profiler.profile("q");
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        profiler.save_report(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["total_queries"], 1);
        assert_eq!(json["unique_queries"], 1);
        assert!(json["query_breakdown"]["q"]["avg_time"].is_f64());
        assert_eq!(json["all_queries"][0]["name"], "q");
        assert!(json["all_queries"][0]["duration"].is_f64());
        assert!(json["all_queries"][0]["timestamp"].is_f64());
    }

    #[test]
    fn test_concurrent_scope_exits() {
        let profiler = QueryProfiler::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let profiler = profiler.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _scope = profiler.profile("parallel");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = profiler.stats();
        assert_eq!(stats.total_queries, 400);
        assert_eq!(stats.query_breakdown["parallel"].count, 400);
    }
}
