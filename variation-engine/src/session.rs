//! Variation session
//!
//! Binds one product scope to its collaborators and carries the working set
//! between operations:
//!
//! ```text
//! refresh:  load_catalog → VariationTree::load → generate → reconcile(draft | store)
//! save:     delete pending records → upsert every record → commit storage ids
//! ```
//!
//! Every operation computes the next working set first and replaces the
//! session's set only after all collaborator writes for it succeeded.
//!
//! Stored records removed from the set stay pending until the next save.
//! Their keys are not regenerated in the meantime, and with a draft cache
//! attached the pending list is written alongside the draft rows.

use crate::core::{EngineConfig, EngineError, EngineResult};
use crate::generator;
use crate::reconcile::{ReconcileStats, reconcile_retaining};
use crate::store::{AttributeSource, CombinationStore, DraftCache};
use crate::tree::VariationTree;
use crate::working_set::WorkingSet;
use rust_decimal::Decimal;
use shared::models::{Combination, CombinationKey, CombinationOrigin, CombinationPatch};
use shared::util::now_millis;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Where a refresh took its persisted records from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileBase {
    Draft,
    Store,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub base: ReconcileBase,
    pub stats: ReconcileStats,
    pub total: usize,
    /// Stored records waiting to be deleted by the next save
    pub pending_deletes: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub upserted: usize,
    pub deleted: usize,
    /// Records that received their first storage id
    pub assigned: usize,
}

/// Combination editing session for one scope
pub struct VariationSession {
    scope_id: String,
    config: EngineConfig,
    source: Arc<dyn AttributeSource>,
    store: Arc<dyn CombinationStore>,
    draft: Option<DraftCache>,
    tree: Option<VariationTree>,
    working_set: WorkingSet,
    /// Stored records removed from the set, deleted on save
    pending_deletes: Vec<Combination>,
    last_refreshed_at: Option<i64>,
    last_saved_at: Option<i64>,
}

impl std::fmt::Debug for VariationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariationSession")
            .field("scope_id", &self.scope_id)
            .field("combinations", &self.working_set.len())
            .field("pending_deletes", &self.pending_deletes.len())
            .field("draft", &self.draft.is_some())
            .finish_non_exhaustive()
    }
}

impl VariationSession {
    pub fn new(
        scope_id: impl Into<String>,
        config: EngineConfig,
        source: Arc<dyn AttributeSource>,
        store: Arc<dyn CombinationStore>,
    ) -> Self {
        Self {
            scope_id: scope_id.into(),
            config,
            source,
            store,
            draft: None,
            tree: None,
            working_set: WorkingSet::new(),
            pending_deletes: Vec::new(),
            last_refreshed_at: None,
            last_saved_at: None,
        }
    }

    pub fn with_draft(mut self, draft: DraftCache) -> Self {
        self.draft = Some(draft);
        self
    }

    /// Attach the draft cache named by `config.draft_path`, if any
    pub fn with_configured_draft(self) -> EngineResult<Self> {
        match self.config.draft_path.clone() {
            Some(path) => {
                tracing::info!(path = %path, "Opening draft cache");
                Ok(self.with_draft(DraftCache::open(path)?))
            }
            None => Ok(self),
        }
    }

    // ========== Accessors ==========

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn tree(&self) -> Option<&VariationTree> {
        self.tree.as_ref()
    }

    pub fn pending_deletes(&self) -> &[Combination] {
        &self.pending_deletes
    }

    pub fn last_refreshed_at(&self) -> Option<i64> {
        self.last_refreshed_at
    }

    pub fn last_saved_at(&self) -> Option<i64> {
        self.last_saved_at
    }

    // ========== Lifecycle ==========

    /// Regenerate from the current catalog and merge with earlier records
    pub async fn refresh(&mut self) -> EngineResult<RefreshReport> {
        let catalog = self.source.load_catalog(&self.scope_id).await?;
        let tree = VariationTree::load(&catalog)?;
        let mut transient = generator::generate(&tree, &self.config)?;

        let mut pending_deletes = self.pending_deletes.clone();
        let (base, mut persisted) = match &self.draft {
            Some(draft) if draft.has_draft(&self.scope_id)? => {
                merge_pending(&mut pending_deletes, draft.load_pending(&self.scope_id)?);
                (ReconcileBase::Draft, draft.load_persisted(&self.scope_id).await?)
            }
            _ => (
                ReconcileBase::Store,
                self.store.load_persisted(&self.scope_id).await?,
            ),
        };

        // Removed records must not come back before the save deletes them
        let removed_keys: HashSet<CombinationKey> =
            pending_deletes.iter().map(|p| p.key().clone()).collect();
        let removed_rows: HashSet<String> = pending_deletes
            .iter()
            .filter_map(|p| p.storage_id.clone())
            .collect();
        transient.retain(|c| !removed_keys.contains(c.key()));
        persisted.retain(|c| {
            !c.storage_id
                .as_ref()
                .is_some_and(|id| removed_rows.contains(id))
        });

        // Custom records stay while every option they use is still live
        let outcome = reconcile_retaining(transient, &persisted, |c| {
            c.origin == CombinationOrigin::Custom
                && c.key().iter().all(|id| tree.options().is_live(id))
        });
        merge_pending(&mut pending_deletes, outcome.orphaned);

        self.write_draft(&outcome.working_set, &pending_deletes)?;

        let report = RefreshReport {
            base,
            stats: outcome.stats,
            total: outcome.working_set.len(),
            pending_deletes: pending_deletes.len(),
        };
        tracing::info!(
            scope_id = %self.scope_id,
            base = ?report.base,
            total = report.total,
            pending_deletes = report.pending_deletes,
            "Session refreshed"
        );

        self.tree = Some(tree);
        self.working_set = outcome.working_set;
        self.pending_deletes = pending_deletes;
        self.last_refreshed_at = Some(now_millis());
        Ok(report)
    }

    /// Delete pending records from the store, then write the working set
    ///
    /// Deletes run first: a record re-added under a removed key has no
    /// storage id and would otherwise be upserted onto the row about to be
    /// deleted.
    pub async fn save(&mut self) -> EngineResult<SaveReport> {
        let mut deleted = 0;
        for record in &self.pending_deletes {
            if let Some(storage_id) = &record.storage_id {
                self.store
                    .delete(&self.scope_id, storage_id)
                    .await
                    .inspect_err(|e| {
                        tracing::error!(scope_id = %self.scope_id, storage_id = %storage_id, error = %e, "Delete failed");
                    })?;
                deleted += 1;
            }
        }

        let mut assigned = HashMap::new();
        for combination in self.working_set.iter() {
            let storage_id = self
                .store
                .upsert(&self.scope_id, combination)
                .await
                .inspect_err(|e| {
                    tracing::error!(scope_id = %self.scope_id, id = %combination.id, error = %e, "Upsert failed");
                })?;
            if combination.storage_id.as_deref() != Some(storage_id.as_str()) {
                assigned.insert(combination.id.clone(), storage_id);
            }
        }

        if let Some(draft) = &self.draft {
            draft.delete_scope(&self.scope_id).await?;
        }

        let report = SaveReport {
            upserted: self.working_set.len(),
            deleted,
            assigned: assigned.len(),
        };
        tracing::info!(
            scope_id = %self.scope_id,
            upserted = report.upserted,
            deleted = report.deleted,
            assigned = report.assigned,
            "Session saved"
        );

        self.working_set = self.working_set.with_storage_ids(&assigned);
        self.pending_deletes.clear();
        self.last_saved_at = Some(now_millis());
        Ok(report)
    }

    /// Write the working set to the draft cache
    ///
    /// Returns false when the session has no draft cache.
    pub fn stash_draft(&self) -> EngineResult<bool> {
        match &self.draft {
            Some(draft) => {
                draft.replace_scope(
                    &self.scope_id,
                    self.working_set.combinations(),
                    &self.pending_deletes,
                )?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete every combination of the scope from store and draft
    pub async fn remove_all(&mut self) -> EngineResult<usize> {
        let removed = self.store.delete_scope(&self.scope_id).await?;
        if let Some(draft) = &self.draft {
            draft.delete_scope(&self.scope_id).await?;
        }

        let (empty, _) = self.working_set.remove_all();
        tracing::info!(scope_id = %self.scope_id, removed, "All combinations removed");
        self.working_set = empty;
        self.pending_deletes.clear();
        Ok(removed)
    }

    // ========== Working set operations ==========

    pub fn toggle_active(&mut self, id: &str) -> EngineResult<()> {
        let next = self.working_set.toggle_active(id)?;
        self.commit(next)
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> EngineResult<()> {
        let next = self.working_set.set_active(id, active)?;
        self.commit(next)
    }

    pub fn activate_all(&mut self) -> EngineResult<()> {
        let next = self.working_set.activate_all();
        self.commit(next)
    }

    pub fn deactivate_all(&mut self) -> EngineResult<()> {
        let next = self.working_set.deactivate_all();
        self.commit(next)
    }

    pub fn apply_bulk_price(&mut self, price_delta: Decimal) -> EngineResult<()> {
        let next = self.working_set.apply_bulk_price(price_delta);
        self.commit(next)
    }

    pub fn apply_bulk_stock(&mut self, stock: u32) -> EngineResult<()> {
        let next = self.working_set.apply_bulk_stock(stock);
        self.commit(next)
    }

    pub fn edit(&mut self, id: &str, patch: &CombinationPatch) -> EngineResult<()> {
        let next = self.working_set.edit(id, patch)?;
        self.commit(next)
    }

    pub fn add_custom(&mut self, option_ids: &[String]) -> EngineResult<()> {
        let tree = self.tree.as_ref().ok_or(EngineError::CatalogNotLoaded)?;
        let next = self.working_set.add_custom(tree, &self.config, option_ids)?;
        self.commit(next)
    }

    /// Remove one combination; a stored one is deleted on the next save
    pub fn remove(&mut self, id: &str) -> EngineResult<Combination> {
        let (next, removed) = self.working_set.remove(id)?;
        let mut pending_deletes = self.pending_deletes.clone();
        if removed.is_persisted() {
            merge_pending(&mut pending_deletes, [removed.clone()]);
        }
        self.write_draft(&next, &pending_deletes)?;
        self.working_set = next;
        self.pending_deletes = pending_deletes;
        Ok(removed)
    }

    fn commit(&mut self, next: WorkingSet) -> EngineResult<()> {
        self.write_draft(&next, &self.pending_deletes)?;
        self.working_set = next;
        Ok(())
    }

    /// Write-through to the draft cache, if attached
    fn write_draft(&self, next: &WorkingSet, pending_deletes: &[Combination]) -> EngineResult<()> {
        if let Some(draft) = &self.draft {
            draft
                .replace_scope(&self.scope_id, next.combinations(), pending_deletes)
                .inspect_err(|e| {
                    tracing::error!(scope_id = %self.scope_id, error = %e, "Draft write failed");
                })?;
        }
        Ok(())
    }
}

/// Add stored records to the pending list, once per storage id
fn merge_pending<I>(pending: &mut Vec<Combination>, records: I)
where
    I: IntoIterator<Item = Combination>,
{
    for record in records {
        if record.storage_id.is_some()
            && !pending.iter().any(|p| p.storage_id == record.storage_id)
        {
            pending.push(record);
        }
    }
}
