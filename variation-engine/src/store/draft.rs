//! redb-backed draft cache
//!
//! Holds unsaved combinations between sessions so edits survive a restart.
//! Implements [`CombinationStore`] with the same record shape as the real
//! store; a row's id is the canonical key of its option set.
//!
//! Stored records the user removed but has not yet deleted from the real
//! store are kept in `draft_pending`, so a removal survives a restart too.
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `draft_rows` | `(scope_id, canonical_key)` | JSON-serialized `Combination` |
//! | `draft_pending` | `(scope_id, storage_id)` | JSON-serialized `Combination` |
//! | `draft_meta` | `scope_id` | last write time (ms) |

use super::{CombinationStore, StoreResult};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::Combination;
use std::path::Path;
use std::sync::Arc;

/// Tables keyed by `(scope_id, secondary key)`
type ScopedTable = TableDefinition<'static, (&'static str, &'static str), &'static [u8]>;

const ROWS_TABLE: ScopedTable = TableDefinition::new("draft_rows");

const PENDING_TABLE: ScopedTable = TableDefinition::new("draft_pending");

const META_TABLE: TableDefinition<&str, i64> = TableDefinition::new("draft_meta");

/// Draft storage backed by redb
#[derive(Clone)]
pub struct DraftCache {
    db: Arc<Database>,
}

impl std::fmt::Debug for DraftCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftCache").finish_non_exhaustive()
    }
}

impl DraftCache {
    /// Open or create the cache file at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open a cache that lives only as long as the process
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ROWS_TABLE)?;
            let _ = write_txn.open_table(PENDING_TABLE)?;
            let _ = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Replace the rows and pending deletes of a scope in one transaction
    pub fn replace_scope(
        &self,
        scope_id: &str,
        combinations: &[Combination],
        pending_deletes: &[Combination],
    ) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        Self::clear_scope(&txn, ROWS_TABLE, scope_id)?;
        Self::clear_scope(&txn, PENDING_TABLE, scope_id)?;
        {
            let mut rows = txn.open_table(ROWS_TABLE)?;
            for combination in combinations {
                let canonical = combination.key().canonical();
                let bytes = serde_json::to_vec(combination)?;
                rows.insert((scope_id, canonical.as_str()), bytes.as_slice())?;
            }
            let mut pending = txn.open_table(PENDING_TABLE)?;
            for record in pending_deletes {
                let Some(storage_id) = record.storage_id.as_deref() else {
                    continue;
                };
                let bytes = serde_json::to_vec(record)?;
                pending.insert((scope_id, storage_id), bytes.as_slice())?;
            }
        }
        Self::touch(&txn, scope_id)?;
        txn.commit()?;
        tracing::debug!(
            scope_id,
            combinations = combinations.len(),
            pending_deletes = pending_deletes.len(),
            "Draft replaced"
        );
        Ok(())
    }

    /// Whether the scope holds draft rows or pending deletes
    pub fn has_draft(&self, scope_id: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        for definition in [ROWS_TABLE, PENDING_TABLE] {
            let table = read_txn.open_table(definition)?;
            if let Some(entry) = table.range((scope_id, "")..)?.next() {
                let (key, _) = entry?;
                if key.value().0 == scope_id {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Stored records removed in the draft, awaiting deletion from the real store
    pub fn load_pending(&self, scope_id: &str) -> StoreResult<Vec<Combination>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_TABLE)?;

        let mut pending = Vec::new();
        for entry in table.range((scope_id, "")..)? {
            let (key, value) = entry?;
            if key.value().0 != scope_id {
                break;
            }
            pending.push(serde_json::from_slice(value.value())?);
        }
        Ok(pending)
    }

    /// Last write time of a scope
    pub fn updated_at(&self, scope_id: &str) -> StoreResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META_TABLE)?;
        Ok(table.get(scope_id)?.map(|guard| guard.value()))
    }

    fn touch(txn: &WriteTransaction, scope_id: &str) -> StoreResult<()> {
        let mut meta = txn.open_table(META_TABLE)?;
        meta.insert(scope_id, shared::util::now_millis())?;
        Ok(())
    }

    /// Remove the entries of a scope from `definition`, returning how many there were
    fn clear_scope(
        txn: &WriteTransaction,
        definition: ScopedTable,
        scope_id: &str,
    ) -> StoreResult<usize> {
        let mut table = txn.open_table(definition)?;
        let mut keys_to_remove: Vec<String> = Vec::new();
        for entry in table.range((scope_id, "")..)? {
            let (key, _) = entry?;
            let (scope, secondary) = key.value();
            if scope != scope_id {
                break;
            }
            keys_to_remove.push(secondary.to_string());
        }
        for secondary in &keys_to_remove {
            table.remove((scope_id, secondary.as_str()))?;
        }
        Ok(keys_to_remove.len())
    }
}

#[async_trait]
impl CombinationStore for DraftCache {
    async fn load_persisted(&self, scope_id: &str) -> StoreResult<Vec<Combination>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROWS_TABLE)?;

        let mut combinations = Vec::new();
        for entry in table.range((scope_id, "")..)? {
            let (key, value) = entry?;
            if key.value().0 != scope_id {
                break;
            }
            combinations.push(serde_json::from_slice(value.value())?);
        }
        Ok(combinations)
    }

    async fn upsert(&self, scope_id: &str, combination: &Combination) -> StoreResult<String> {
        let canonical = combination.key().canonical();
        let bytes = serde_json::to_vec(combination)?;

        let txn = self.db.begin_write()?;
        {
            let mut rows = txn.open_table(ROWS_TABLE)?;
            rows.insert((scope_id, canonical.as_str()), bytes.as_slice())?;
        }
        Self::touch(&txn, scope_id)?;
        txn.commit()?;
        Ok(canonical)
    }

    /// `storage_id` is either a draft row id (canonical key) or the real
    /// store's id carried by the record
    async fn delete(&self, scope_id: &str, storage_id: &str) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut rows = txn.open_table(ROWS_TABLE)?;
            let mut keys_to_remove: Vec<String> = Vec::new();
            for entry in rows.range((scope_id, "")..)? {
                let (key, value) = entry?;
                let (scope, canonical) = key.value();
                if scope != scope_id {
                    break;
                }
                let combination: Combination = serde_json::from_slice(value.value())?;
                if canonical == storage_id || combination.storage_id.as_deref() == Some(storage_id) {
                    keys_to_remove.push(canonical.to_string());
                }
            }
            for canonical in &keys_to_remove {
                rows.remove((scope_id, canonical.as_str()))?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    async fn delete_scope(&self, scope_id: &str) -> StoreResult<usize> {
        let txn = self.db.begin_write()?;
        let removed = Self::clear_scope(&txn, ROWS_TABLE, scope_id)?;
        Self::clear_scope(&txn, PENDING_TABLE, scope_id)?;
        {
            let mut meta = txn.open_table(META_TABLE)?;
            meta.remove(scope_id)?;
        }
        txn.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{CombinationKey, CombinationOrigin};

    fn combination(id: &str, options: &[&str]) -> Combination {
        Combination {
            id: id.to_string(),
            selected_option_ids: CombinationKey::from_ids(options.iter().copied()),
            attribute_paths: vec!["Color".to_string()],
            is_composite: options.len() > 1,
            name: id.to_string(),
            sku: Some("R-S".to_string()),
            barcode: None,
            image_url: None,
            price_delta: Decimal::new(350, 2),
            stock: 4,
            notes: Some("gift wrap".to_string()),
            is_active: true,
            origin: CombinationOrigin::Automatic,
            is_modified: true,
            storage_id: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_load_by_scope() {
        let cache = DraftCache::open_in_memory().unwrap();
        let row_id = cache.upsert("p1", &combination("c1", &["s", "red"])).await.unwrap();
        assert_eq!(row_id, "red|s");
        cache.upsert("p2", &combination("c2", &["blue"])).await.unwrap();
        // Scope ids sharing a prefix stay separate
        cache.upsert("p10", &combination("c3", &["green"])).await.unwrap();

        let rows = cache.load_persisted("p1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "c1");
        assert_eq!(rows[0].price_delta, Decimal::new(350, 2));
        assert!(cache.has_draft("p1").unwrap());
        assert!(!cache.has_draft("p3").unwrap());
        assert!(cache.updated_at("p1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upsert_same_key_overwrites() {
        let cache = DraftCache::open_in_memory().unwrap();
        cache.upsert("p1", &combination("c1", &["red"])).await.unwrap();
        cache.upsert("p1", &combination("c9", &["red"])).await.unwrap();

        let rows = cache.load_persisted("p1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "c9");
    }

    #[tokio::test]
    async fn test_delete_by_row_or_storage_id() {
        let cache = DraftCache::open_in_memory().unwrap();
        let mut stored = combination("c1", &["red"]);
        stored.storage_id = Some("combination:1".to_string());
        cache.upsert("p1", &stored).await.unwrap();
        cache.upsert("p1", &combination("c2", &["blue"])).await.unwrap();

        cache.delete("p1", "combination:1").await.unwrap();
        cache.delete("p1", "blue").await.unwrap();
        cache.delete("p1", "missing").await.unwrap();
        assert!(cache.load_persisted("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_and_delete_scope() {
        let cache = DraftCache::open_in_memory().unwrap();
        cache.upsert("p1", &combination("old", &["blue"])).await.unwrap();
        cache
            .replace_scope(
                "p1",
                &[combination("a", &["red"]), combination("b", &["red", "s"])],
                &[],
            )
            .unwrap();

        let rows = cache.load_persisted("p1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.id != "old"));

        assert_eq!(cache.delete_scope("p1").await.unwrap(), 2);
        assert!(!cache.has_draft("p1").unwrap());
        assert!(cache.updated_at("p1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_deletes_kept_with_rows() {
        let cache = DraftCache::open_in_memory().unwrap();
        let mut removed = combination("gone", &["blue"]);
        removed.storage_id = Some("combination:9".to_string());
        let unsaved = combination("new", &["green"]);

        // Records without a storage id have nothing to delete and are skipped
        cache
            .replace_scope("p1", &[combination("a", &["red"])], &[removed.clone(), unsaved])
            .unwrap();
        assert_eq!(cache.load_pending("p1").unwrap(), vec![removed]);
        assert!(cache.load_pending("p2").unwrap().is_empty());

        // Pending deletes alone still count as a draft
        cache.replace_scope("p2", &[], &[stored_pending()]).unwrap();
        assert!(cache.has_draft("p2").unwrap());

        cache.replace_scope("p1", &[combination("a", &["red"])], &[]).unwrap();
        assert!(cache.load_pending("p1").unwrap().is_empty());

        cache.delete_scope("p2").await.unwrap();
        assert!(!cache.has_draft("p2").unwrap());
        assert!(cache.load_pending("p2").unwrap().is_empty());
    }

    fn stored_pending() -> Combination {
        Combination {
            storage_id: Some("combination:7".to_string()),
            ..combination("old", &["s"])
        }
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.redb");

        {
            let cache = DraftCache::open(&path).unwrap();
            cache.upsert("p1", &combination("c1", &["red"])).await.unwrap();
        }

        let cache = DraftCache::open(&path).unwrap();
        let rows = cache.load_persisted("p1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notes.as_deref(), Some("gift wrap"));
    }
}
