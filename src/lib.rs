//! Tribal Land Checker - batch geocoding and tribal boundary membership
//!
//! This library provides the resolve → classify pipeline used by the
//! `tribal-check` binary.

pub mod batch;
pub mod config;
pub mod geocode;
pub mod models;
pub mod pip;
pub mod table;

pub use batch::{BatchProcessor, BatchReport, RowOutcome};
pub use geocode::CoordinateResolver;
pub use models::{Classification, ClassificationSummary, Coordinate};
pub use pip::{BoundaryStore, PipService, TribalBoundary};
