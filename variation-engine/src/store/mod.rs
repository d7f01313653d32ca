//! Persistence boundary
//!
//! The engine reads attribute catalogs from an [`AttributeSource`] and writes
//! combinations through a [`CombinationStore`]. Both are async traits so the
//! engine stays independent of the backing database.

pub mod draft;
pub mod memory;

pub use draft::DraftCache;
pub use memory::MemoryStore;

use async_trait::async_trait;
use shared::models::{CatalogSnapshot, Combination};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read side: attribute forest and options for a product scope
#[async_trait]
pub trait AttributeSource: Send + Sync {
    async fn load_catalog(&self, scope_id: &str) -> StoreResult<CatalogSnapshot>;
}

/// Write side: persisted combinations for a product scope
#[async_trait]
pub trait CombinationStore: Send + Sync {
    /// All stored combinations of the scope
    async fn load_persisted(&self, scope_id: &str) -> StoreResult<Vec<Combination>>;

    /// Insert or update one combination, returning its storage id
    ///
    /// Records without a storage id are matched by option set, so retrying
    /// after a partial failure never duplicates rows.
    async fn upsert(&self, scope_id: &str, combination: &Combination) -> StoreResult<String>;

    /// Delete one stored combination; missing rows are ignored
    async fn delete(&self, scope_id: &str, storage_id: &str) -> StoreResult<()>;

    /// Delete every combination of the scope, returning how many were removed
    async fn delete_scope(&self, scope_id: &str) -> StoreResult<usize>;
}
