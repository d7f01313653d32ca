//! Reconciliation Engine
//!
//! Merges a freshly generated (transient) combination list against a
//! previously persisted snapshot, matching records by option set rather
//! than by id.
//!
//! | persisted match          | result                                         |
//! |--------------------------|------------------------------------------------|
//! | none                     | transient record, new and inactive             |
//! | unmodified               | transient aggregates, persisted id/storage id/activation |
//! | modified                 | persisted record; only derived paths refreshed |
//! | persisted, no transient  | orphaned if stored, dropped otherwise          |

use crate::working_set::WorkingSet;
use shared::models::{Combination, CombinationKey};
use std::collections::{HashMap, HashSet};

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Unmodified records refreshed from the transient set
    pub refreshed: usize,
    /// Modified records kept as persisted
    pub preserved: usize,
    /// New records with no persisted counterpart
    pub added: usize,
    /// Persisted records kept although the generator no longer emits them
    pub retained: usize,
    /// Unpersisted records whose options disappeared
    pub dropped: usize,
    /// Stored records whose options disappeared
    pub orphaned: usize,
}

/// Result of a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub working_set: WorkingSet,
    /// Stored records to be deleted by the caller
    pub orphaned: Vec<Combination>,
    pub stats: ReconcileStats,
}

/// Merge `transient` against `persisted`
pub fn reconcile(transient: Vec<Combination>, persisted: &[Combination]) -> ReconcileOutcome {
    reconcile_retaining(transient, persisted, |_| false)
}

/// Merge `transient` against `persisted`, keeping unmatched persisted
/// records for which `retain` returns true
pub fn reconcile_retaining<F>(
    transient: Vec<Combination>,
    persisted: &[Combination],
    retain: F,
) -> ReconcileOutcome
where
    F: Fn(&Combination) -> bool,
{
    let mut index: HashMap<&CombinationKey, &Combination> = HashMap::with_capacity(persisted.len());
    for record in persisted {
        if index.contains_key(record.key()) {
            tracing::warn!(
                key = %record.key(),
                id = %record.id,
                "Duplicate persisted combination ignored"
            );
            continue;
        }
        index.insert(record.key(), record);
    }

    let mut stats = ReconcileStats::default();
    let mut matched: HashSet<&CombinationKey> = HashSet::with_capacity(index.len());
    let mut merged = Vec::with_capacity(transient.len());

    for fresh in transient {
        let Some(&previous) = index.get(fresh.key()) else {
            stats.added += 1;
            merged.push(Combination {
                is_active: false,
                storage_id: None,
                ..fresh
            });
            continue;
        };
        matched.insert(previous.key());

        if previous.is_modified {
            stats.preserved += 1;
            tracing::debug!(key = %previous.key(), id = %previous.id, "Keeping modified combination");
            merged.push(Combination {
                attribute_paths: fresh.attribute_paths,
                is_composite: fresh.is_composite,
                ..previous.clone()
            });
        } else {
            stats.refreshed += 1;
            merged.push(Combination {
                id: previous.id.clone(),
                storage_id: previous.storage_id.clone(),
                is_active: previous.is_active,
                origin: previous.origin,
                ..fresh
            });
        }
    }

    let mut orphaned = Vec::new();
    for record in persisted {
        // Skip duplicates that lost the index slot, and matched records
        let indexed = index.get(record.key()).is_some_and(|&r| std::ptr::eq(r, record));
        if !indexed || matched.contains(record.key()) {
            continue;
        }
        if retain(record) {
            stats.retained += 1;
            merged.push(record.clone());
        } else if record.is_persisted() {
            stats.orphaned += 1;
            tracing::warn!(
                key = %record.key(),
                storage_id = ?record.storage_id,
                "Combination orphaned, options no longer available"
            );
            orphaned.push(record.clone());
        } else {
            stats.dropped += 1;
            tracing::debug!(key = %record.key(), "Draft combination dropped");
        }
    }

    tracing::info!(
        refreshed = stats.refreshed,
        preserved = stats.preserved,
        added = stats.added,
        retained = stats.retained,
        dropped = stats.dropped,
        orphaned = stats.orphaned,
        "Combinations reconciled"
    );

    ReconcileOutcome {
        working_set: WorkingSet::from_combinations(merged),
        orphaned,
        stats,
    }
}
