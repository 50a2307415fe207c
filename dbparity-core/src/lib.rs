//! Core engine for comparing tabular result sets across heterogeneous
//! databases.
//!
//! The crate fetches nothing itself; callers implement the
//! [`executor::ConnectionFactory`] and [`executor::QueryExecutor`]
//! capability traits for their backends, and this crate supplies the
//! rest: fingerprint-keyed connection pooling, value normalization,
//! record matching by primary key, field-level delta detection, and a
//! deterministic, serializable result model.
//!
//! # Example
//!
//! ```
//! use dbparity_core::{ComparisonEngine, ComparisonRequest, Dataset};
//!
//! # fn main() -> dbparity_core::Result<()> {
//! let mut source = Dataset::new("source", vec!["id".into(), "name".into()]);
//! source.push_values(["1", "Alice"])?;
//! let mut target = Dataset::new("target", vec!["ID".into(), "Name".into()]);
//! target.push_values(["1", "Alice"])?;
//!
//! let request = ComparisonRequest::new(source, target, "id");
//! let result = ComparisonEngine::new().compare(&request)?;
//! assert!(result.is_perfect_match());
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod perf;
pub mod pool;
pub mod session;

pub use compare::{
    ComparisonEngine, ComparisonRequest, ComparisonResult, ComparisonSummary, DEFAULT_CHUNK_SIZE,
    FieldDelta,
};
pub use error::{ParityError, Result};
pub use executor::{ConnectionFactory, QueryExecutor};
pub use models::{Dataset, Record};
pub use normalize::ValueNormalizer;
pub use perf::{PerformanceMonitor, PerformanceReport};
pub use pool::{ConnectionFingerprint, ConnectionPool};
pub use session::ComparisonSession;
