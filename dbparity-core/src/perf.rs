//! Named start/stop timers for one comparison session.
//!
//! The monitor is session-scoped by design: each session owns its own
//! instance so timings from concurrent sessions never contaminate each
//! other. The accumulated report is attached to the session's
//! [`crate::compare::ComparisonResult`] for downstream reporting.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accumulated operation timings, name to elapsed duration.
///
/// `BTreeMap` keeps report output stable for serialization and diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceReport {
    timings: BTreeMap<String, Duration>,
}

impl PerformanceReport {
    /// Elapsed duration recorded under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Duration> {
        self.timings.get(name).copied()
    }

    /// All recorded timings in name order.
    pub fn timings(&self) -> &BTreeMap<String, Duration> {
        &self.timings
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }
}

/// Accumulates named timings over one comparison session.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    running: HashMap<String, Instant>,
    completed: BTreeMap<String, Duration>,
}

impl PerformanceMonitor {
    /// Creates an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the timer for `name`. Last start wins.
    pub fn start(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.running.insert(name.clone(), Instant::now()).is_some() {
            debug!("Timer '{}' restarted while running", name);
        }
    }

    /// Stops the timer for `name` and records its elapsed duration.
    ///
    /// Stopping a name that was never started returns `None`; that is not
    /// an error. A second measurement under the same name replaces the
    /// first.
    pub fn stop(&mut self, name: &str) -> Option<Duration> {
        let elapsed = self.running.remove(name)?.elapsed();
        self.completed.insert(name.to_string(), elapsed);
        debug!("Timer '{}' stopped at {:?}", name, elapsed);
        Some(elapsed)
    }

    /// Snapshot of every completed measurement.
    pub fn report(&self) -> PerformanceReport {
        PerformanceReport {
            timings: self.completed.clone(),
        }
    }

    /// Clears all running and completed timers.
    pub fn reset(&mut self) {
        self.running.clear();
        self.completed.clear();
    }
}
