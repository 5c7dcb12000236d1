//! Increment-only counters.
//!
//! Recording is fire-and-forget: implementations never fail and never block
//! the caller on a backend.

use std::collections::BTreeMap;

use dashmap::DashMap;

/// Counter incremented when a unique tracking number is accepted.
pub const TRACKING_NUMBER_GENERATED: &str = "tracking.number.generated";

/// Counter incremented when a candidate already exists in the store.
pub const TRACKING_NUMBER_COLLISION: &str = "tracking.number.collision";

/// Counter incremented when generation gives up.
pub const TRACKING_NUMBER_FAILURE: &str = "tracking.number.failure";

/// Sink for counter increments.
pub trait MetricsRecorder: Send + Sync {
    /// Adds one to the counter identified by `name` and `labels`.
    fn increment(&self, name: &str, labels: &[(&str, &str)]);
}

/// Process-local counter registry.
///
/// Each distinct label set is its own series, keyed as `name{k=v,...}` with
/// labels sorted by key.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: DashMap<String, u64>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one series; zero when it was never incremented.
    pub fn get(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .get(&series_key(name, labels))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Sum over every series of `name`, whatever the labels.
    pub fn total(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|entry| series_name(entry.key()) == name)
            .map(|entry| *entry.value())
            .sum()
    }

    /// Sorted copy of all series.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

impl MetricsRecorder for InMemoryMetrics {
    fn increment(&self, name: &str, labels: &[(&str, &str)]) {
        let key = series_key(name, labels);
        tracing::trace!(series = %key, "counter incremented");
        *self.counters.entry(key).or_insert(0) += 1;
    }
}

fn series_key(name: &str, labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return name.to_string();
    }
    let mut sorted = labels.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let rendered: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{}{{{}}}", name, rendered.join(","))
}

fn series_name(key: &str) -> &str {
    key.split_once('{').map_or(key, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_separate_series() {
        let metrics = InMemoryMetrics::new();
        metrics.increment(TRACKING_NUMBER_GENERATED, &[("origin", "US"), ("destination", "CA")]);
        metrics.increment(TRACKING_NUMBER_GENERATED, &[("destination", "CA"), ("origin", "US")]);
        metrics.increment(TRACKING_NUMBER_GENERATED, &[("origin", "DE"), ("destination", "FR")]);

        assert_eq!(
            metrics.get(TRACKING_NUMBER_GENERATED, &[("origin", "US"), ("destination", "CA")]),
            2
        );
        assert_eq!(metrics.total(TRACKING_NUMBER_GENERATED), 3);
        assert_eq!(metrics.total(TRACKING_NUMBER_COLLISION), 0);
    }

    #[test]
    fn test_snapshot_keys() {
        let metrics = InMemoryMetrics::new();
        metrics.increment(TRACKING_NUMBER_COLLISION, &[]);
        metrics.increment(TRACKING_NUMBER_GENERATED, &[("origin", "US"), ("destination", "CA")]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.get("tracking.number.collision"), Some(&1));
        assert_eq!(
            snapshot.get("tracking.number.generated{destination=CA,origin=US}"),
            Some(&1)
        );
    }
}
