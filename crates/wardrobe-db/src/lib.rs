//! Local outfit storage on SQLite
//!
//! Owns the `outfits` table the reconciler reads pending records from and
//! writes weather aggregates back to. Every query is scoped by owner.

pub mod client;
pub mod queries;
pub mod schema;
pub mod store;

pub use client::*;
pub use schema::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;
