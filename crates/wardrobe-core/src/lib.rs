//! Core data types, hourly grids, and weather rollups for outfit records
//!
//! This crate holds the pure parts of the pipeline: the record model, the
//! timestamp grid generator, the sample aggregator, and the collaborator
//! traits the reconciler drives.

pub mod grid;
pub mod pipeline;
pub mod rollups;
pub mod types;
pub mod units;

pub use grid::*;
pub use pipeline::*;
pub use rollups::*;
pub use types::*;
pub use units::*;
