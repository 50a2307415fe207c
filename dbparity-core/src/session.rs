//! One comparison run from fetch to timed result.
//!
//! A [`ComparisonSession`] owns the connection pool and the performance
//! monitor for a single logical comparison, so two sessions running in
//! parallel share nothing. The typical flow: `fetch_dataset` for each
//! side, `compare`, then `finish` to release pooled handles.

use std::sync::Arc;

use tracing::info;

use crate::compare::{ComparisonEngine, ComparisonRequest, ComparisonResult};
use crate::error::Result;
use crate::executor::{ConnectionFactory, QueryExecutor};
use crate::models::Dataset;
use crate::perf::PerformanceMonitor;
use crate::pool::{ConnectionFingerprint, ConnectionPool};

/// Coordinates pooled connections, timing, and comparison for one run.
pub struct ComparisonSession<H> {
    pool: ConnectionPool<H>,
    monitor: PerformanceMonitor,
    engine: ComparisonEngine,
}

impl<H: Send + Sync> Default for ComparisonSession<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Send + Sync> ComparisonSession<H> {
    /// Creates a session with a fresh pool and monitor.
    pub fn new() -> Self {
        Self {
            pool: ConnectionPool::new(),
            monitor: PerformanceMonitor::new(),
            engine: ComparisonEngine::new(),
        }
    }

    /// Creates a session around a pre-configured pool.
    pub fn with_pool(pool: ConnectionPool<H>) -> Self {
        Self {
            pool,
            monitor: PerformanceMonitor::new(),
            engine: ComparisonEngine::new(),
        }
    }

    /// Fetches one side of a comparison, timing the connection and the
    /// query separately.
    ///
    /// The connection timing is recorded as `connect:<cache-key>`, the
    /// query timing as `query:<label>`. Repeat fetches against the same
    /// fingerprint reuse the pooled handle.
    ///
    /// # Errors
    /// Connection errors from the pool, query errors from the executor.
    pub async fn fetch_dataset<F, E>(
        &mut self,
        fingerprint: &ConnectionFingerprint,
        factory: &F,
        executor: &E,
        query: &str,
        label: &str,
    ) -> Result<Dataset>
    where
        F: ConnectionFactory<Handle = H>,
        E: QueryExecutor<H>,
    {
        let connect_timer = format!("connect:{}", fingerprint.cache_key());
        self.monitor.start(connect_timer.clone());
        let handle: Arc<H> = self.pool.acquire(fingerprint, || factory.connect()).await?;
        self.monitor.stop(&connect_timer);

        let query_timer = format!("query:{label}");
        self.monitor.start(query_timer.clone());
        let dataset = executor.execute(&handle, query).await?;
        self.monitor.stop(&query_timer);

        info!(
            "Fetched dataset '{}' from {}: {} rows, {} columns",
            label,
            fingerprint,
            dataset.len(),
            dataset.columns().len()
        );
        Ok(dataset)
    }

    /// Runs the comparison, timing it as `compare:<label>`, and attaches
    /// every timing recorded so far to the result.
    ///
    /// # Errors
    /// Any validation or comparison error from the engine.
    pub fn compare(&mut self, request: &ComparisonRequest) -> Result<ComparisonResult> {
        let timer = format!("compare:{}", request.label());
        self.monitor.start(timer.clone());
        let result = self.engine.compare(request);
        self.monitor.stop(&timer);
        Ok(result?.with_performance(self.monitor.report()))
    }

    /// Releases pooled handles and clears the monitor.
    ///
    /// The session stays usable afterwards; subsequent fetches reconnect.
    pub async fn finish(&mut self) {
        self.pool.release_all().await;
        self.monitor.reset();
    }

    /// The session's connection pool.
    pub fn pool(&self) -> &ConnectionPool<H> {
        &self.pool
    }

    /// Timings recorded so far.
    pub fn performance(&self) -> crate::perf::PerformanceReport {
        self.monitor.report()
    }
}
