//! # Stats Store Contract
//!
//! Telemetry persistence is an external collaborator; the orchestrator and
//! the query pipeline only depend on this trait. [`MemoryStatsStore`] is
//! the in-process default, enough for tests and small deployments.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// Time-series sink and source keyed by series name.
pub trait StatsStore: Send + Sync {
    /// Records one sample.
    fn put(&self, series: &str, timestamp: u64, value: f64);

    /// Samples of a series inside `[start, end]`, ascending by timestamp.
    /// Open bounds when `None`.
    fn query(&self, series: &str, start: Option<u64>, end: Option<u64>) -> Vec<(u64, f64)>;
}

/// In-memory stats store backed by ordered maps.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    series: RwLock<BTreeMap<String, BTreeMap<u64, f64>>>,
}

impl MemoryStatsStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStatsStore {
    fn put(&self, series: &str, timestamp: u64, value: f64) {
        self.series
            .write()
            .entry(series.to_owned())
            .or_default()
            .insert(timestamp, value);
    }

    fn query(&self, series: &str, start: Option<u64>, end: Option<u64>) -> Vec<(u64, f64)> {
        let guard = self.series.read();
        let Some(samples) = guard.get(series) else {
            return Vec::new();
        };
        let lo = start.unwrap_or(u64::MIN);
        let hi = end.unwrap_or(u64::MAX);
        samples
            .range(lo..=hi)
            .map(|(t, v)| (*t, *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_query_in_window() {
        let store = MemoryStatsStore::new();
        store.put("population_size", 10, 4.0);
        store.put("population_size", 20, 6.0);
        store.put("population_size", 30, 5.0);

        let all = store.query("population_size", None, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], (10, 4.0));

        let windowed = store.query("population_size", Some(15), Some(30));
        assert_eq!(windowed, vec![(20, 6.0), (30, 5.0)]);
    }

    #[test]
    fn unknown_series_is_empty() {
        let store = MemoryStatsStore::new();
        assert!(store.query("missing", None, None).is_empty());
    }
}
