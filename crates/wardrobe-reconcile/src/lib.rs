//! Outfit weather reconciliation
//!
//! Finds outfits whose worn interval has ended, fetches weather for the
//! interval, aggregates it, and attaches the result. Each outfit is an
//! isolated unit of work; failures are logged and retried on a later pass.

pub mod reconciler;
pub mod scheduler;

pub use reconciler::*;
pub use scheduler::*;

use thiserror::Error;
use wardrobe_core::{AggregateError, GridError, OutfitId};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid interval for outfit {outfit_id}: {source}")]
    InvalidInterval {
        outfit_id: OutfitId,
        source: GridError,
    },

    #[error("No samples to aggregate for outfit {0}")]
    EmptyInput(OutfitId),

    #[error("Aggregation failed for outfit {outfit_id}: {source}")]
    Aggregation {
        outfit_id: OutfitId,
        source: AggregateError,
    },

    #[error("No weather samples available for outfit {0}")]
    NoSamplesAvailable(OutfitId),

    #[error("Weather fetch failed for outfit {outfit_id}: {message}")]
    FetchTransient { outfit_id: OutfitId, message: String },

    #[error("Failed to persist outfit {outfit_id}: {message}")]
    Persistence { outfit_id: OutfitId, message: String },

    #[error("Failed to list pending outfits: {0}")]
    PendingQuery(String),
}

impl ReconcileError {
    /// Whether a later pass may succeed without upstream data changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::NoSamplesAvailable(_)
                | ReconcileError::FetchTransient { .. }
                | ReconcileError::Persistence { .. }
                | ReconcileError::PendingQuery(_)
        )
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
