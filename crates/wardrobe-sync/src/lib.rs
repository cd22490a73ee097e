//! Remote document store synchronisation
//!
//! Local writes are pushed fire-and-forget through a bounded channel. A
//! periodic sweep re-pushes anything still flagged, and remote changes are
//! merged back with last-write-wins.

pub mod http;
pub mod listener;
pub mod sweeper;
pub mod worker;

pub use http::*;
pub use listener::*;
pub use sweeper::*;
pub use worker::*;

use thiserror::Error;
use tokio::sync::mpsc;
use wardrobe_core::OutfitWeatherRecord;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Push failed for outfit {outfit_id}: {message}")]
    Propagation { outfit_id: String, message: String },

    #[error("Local store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Channel of locally updated records awaiting a remote push
pub type SyncReceiver = mpsc::Receiver<OutfitWeatherRecord>;
pub type SyncSender = mpsc::Sender<OutfitWeatherRecord>;

/// Create a new sync channel with specified buffer size
pub fn create_sync_channel(buffer_size: usize) -> (SyncSender, SyncReceiver) {
    mpsc::channel(buffer_size)
}
