//! Capability traits for the engine's external collaborators.
//!
//! The engine never runs queries or opens connections itself. Callers
//! supply a [`ConnectionFactory`] that produces opaque, already
//! authenticated backend handles, and a [`QueryExecutor`] that turns a
//! handle plus query text into a [`Dataset`]. How the query actually runs
//! against Oracle, Postgres, or Mongo is outside this core; only the
//! returned shape matters.

use async_trait::async_trait;

use crate::Result;
use crate::models::Dataset;

/// Produces backend handles for the connection pool.
///
/// Implementations carry their own resolved configuration and credentials;
/// the pool only ever sees the fingerprint and the finished handle.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// The opaque backend handle type this factory produces.
    type Handle: Send + Sync;

    /// Opens a new backend handle.
    ///
    /// # Errors
    /// Any failure to produce a usable handle. The pool wraps it in a
    /// [`crate::error::ParityError::Connection`] carrying the fingerprint
    /// and does not retry.
    async fn connect(&self) -> Result<Self::Handle>;
}

/// Runs query text against a backend handle and materializes the result.
#[async_trait]
pub trait QueryExecutor<H>: Send + Sync {
    /// Executes `query` on `handle` and returns the materialized rows.
    ///
    /// The returned dataset's columns and numeric-column classification
    /// drive column alignment and value canonicalization downstream.
    ///
    /// # Errors
    /// Any backend failure; surfaced unchanged to the caller of
    /// [`crate::session::ComparisonSession::fetch_dataset`].
    async fn execute(&self, handle: &H, query: &str) -> Result<Dataset>;
}
