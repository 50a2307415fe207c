//! Dataset comparison: request configuration, the engine, and the
//! result model.
//!
//! The flow is deliberately linear: build a [`ComparisonRequest`] from
//! two materialized [`crate::models::Dataset`]s, hand it to a
//! [`ComparisonEngine`], read the [`ComparisonResult`]. The engine owns
//! the algorithm; the request owns the knobs; the result owns the
//! answer.

mod engine;
mod request;
mod result;

pub use engine::ComparisonEngine;
pub use request::{ComparisonRequest, DEFAULT_CHUNK_SIZE};
pub use result::{ComparisonResult, ComparisonSummary, FieldDelta};
