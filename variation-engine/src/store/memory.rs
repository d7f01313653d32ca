//! In-process store
//!
//! Backs both store traits with plain maps. Used by tests and embedders that
//! keep the catalog in memory. A write budget can be set to make the store
//! fail after a number of writes.

use super::{AttributeSource, CombinationStore, StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::{CatalogSnapshot, Combination};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    catalogs: HashMap<String, CatalogSnapshot>,
    rows: HashMap<String, Vec<Combination>>,
    /// Remaining successful writes before failing (None = unlimited)
    write_budget: Option<usize>,
}

/// Memory-backed [`AttributeSource`] + [`CombinationStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_catalog(&self, scope_id: &str, catalog: CatalogSnapshot) {
        self.inner.write().catalogs.insert(scope_id.to_string(), catalog);
    }

    /// Stored rows of a scope
    pub fn rows(&self, scope_id: &str) -> Vec<Combination> {
        self.inner
            .read()
            .rows
            .get(scope_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Allow `writes` more upserts/deletes, then fail with [`StoreError::Unavailable`]
    pub fn fail_after(&self, writes: usize) {
        self.inner.write().write_budget = Some(writes);
    }

    pub fn clear_failure(&self) {
        self.inner.write().write_budget = None;
    }
}

impl Inner {
    fn spend_write(&mut self) -> StoreResult<()> {
        match self.write_budget.as_mut() {
            Some(0) => Err(StoreError::Unavailable("write budget exhausted".into())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AttributeSource for MemoryStore {
    async fn load_catalog(&self, scope_id: &str) -> StoreResult<CatalogSnapshot> {
        Ok(self
            .inner
            .read()
            .catalogs
            .get(scope_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl CombinationStore for MemoryStore {
    async fn load_persisted(&self, scope_id: &str) -> StoreResult<Vec<Combination>> {
        Ok(self.rows(scope_id))
    }

    async fn upsert(&self, scope_id: &str, combination: &Combination) -> StoreResult<String> {
        let mut inner = self.inner.write();
        inner.spend_write()?;

        let rows = inner.rows.entry(scope_id.to_string()).or_default();
        let existing = rows.iter().position(|row| match &combination.storage_id {
            Some(storage_id) => row.storage_id.as_ref() == Some(storage_id),
            None => row.key() == combination.key(),
        });

        match existing {
            Some(index) => {
                let storage_id = rows[index]
                    .storage_id
                    .clone()
                    .unwrap_or_else(|| format!("combination:{}", shared::util::new_id()));
                rows[index] = Combination {
                    storage_id: Some(storage_id.clone()),
                    ..combination.clone()
                };
                Ok(storage_id)
            }
            None => {
                let storage_id = combination
                    .storage_id
                    .clone()
                    .unwrap_or_else(|| format!("combination:{}", shared::util::new_id()));
                rows.push(Combination {
                    storage_id: Some(storage_id.clone()),
                    ..combination.clone()
                });
                Ok(storage_id)
            }
        }
    }

    async fn delete(&self, scope_id: &str, storage_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.spend_write()?;
        if let Some(rows) = inner.rows.get_mut(scope_id) {
            rows.retain(|row| row.storage_id.as_deref() != Some(storage_id));
        }
        Ok(())
    }

    async fn delete_scope(&self, scope_id: &str) -> StoreResult<usize> {
        let mut inner = self.inner.write();
        inner.spend_write()?;
        Ok(inner.rows.remove(scope_id).map(|rows| rows.len()).unwrap_or(0))
    }
}
