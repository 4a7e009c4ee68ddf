//! Trade store contract and its in-memory implementation.
//!
//! The SQLite implementation lives in [`crate::db`].

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Trade;

pub use memory::MemoryStore;

/// Trade store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("trade {0} not found")]
    NotFound(String),

    #[error("trade {0} already exists")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt trade record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD over trade records keyed by id.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// All trades, most recent trade date first.
    async fn get_all(&self) -> StoreResult<Vec<Trade>>;

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Trade>>;

    /// Add a new trade. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, trade: &Trade) -> StoreResult<()>;

    /// Replace the trade with the same id. Fails with `NotFound` if absent.
    async fn update(&self, trade: &Trade) -> StoreResult<()>;

    /// Delete by id. Fails with `NotFound` if absent.
    async fn delete_by_id(&self, id: &str) -> StoreResult<()>;
}
