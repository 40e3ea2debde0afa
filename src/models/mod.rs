//! Core data models for the tribal land checker.

pub mod classification;
pub mod coordinate;

pub use classification::{Classification, ClassificationSummary};
pub use coordinate::{CoordError, Coordinate};
