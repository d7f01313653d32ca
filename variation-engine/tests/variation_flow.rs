use rust_decimal::Decimal;
use shared::models::{
    AttributeNode, CatalogSnapshot, CombinationKey, CombinationOrigin, CombinationPatch,
    OptionValue,
};
use std::sync::Arc;
use variation_engine::{
    DraftCache, EngineConfig, EngineError, MemoryStore, ReconcileBase, StoreError,
    VariationSession,
};

const SCOPE: &str = "product:42";

fn option(id: &str, attribute: &str, name: &str, price_cents: i64, stock: u32) -> OptionValue {
    OptionValue::new(id, attribute, name)
        .with_price_delta(Decimal::new(price_cents, 2))
        .with_stock(stock)
}

/// Color(red, blue) x Size(xl, s)
fn apparel(extra: Vec<OptionValue>) -> CatalogSnapshot {
    let mut options = vec![
        option("red", "color", "RED", 500, 10),
        option("blue", "color", "BLUE", 0, 8),
        option("xl", "size", "XL", -200, 4),
        option("s", "size", "S", 0, 12),
    ];
    options.extend(extra);
    CatalogSnapshot::new(
        vec![
            AttributeNode::root("color", "Color"),
            AttributeNode::root("size", "Size"),
        ],
        options,
    )
}

fn key(ids: &[&str]) -> CombinationKey {
    CombinationKey::from_ids(ids.iter().copied())
}

fn session(store: &MemoryStore) -> VariationSession {
    VariationSession::new(
        SCOPE,
        EngineConfig::default(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
}

fn id_of(session: &VariationSession, ids: &[&str]) -> String {
    session
        .working_set()
        .find_by_key(&key(ids))
        .map(|c| c.id.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_edit_survives_regeneration() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let mut session = session(&store);

    let report = session.refresh().await.unwrap();
    assert_eq!(report.total, 8);

    let composite = session
        .working_set()
        .find_by_key(&key(&["red", "xl"]))
        .unwrap()
        .clone();
    assert_eq!(composite.name, "Color - RED / Size - XL");
    assert_eq!(composite.price_delta, Decimal::new(300, 2));
    assert_eq!(composite.stock, 4);

    let patch = CombinationPatch {
        name: Some("Red XL Special".to_string()),
        ..Default::default()
    };
    session.edit(&composite.id, &patch).unwrap();
    session.save().await.unwrap();

    // New option appears in the catalog
    store.set_catalog(SCOPE, apparel(vec![option("green", "color", "GREEN", 100, 3)]));
    let report = session.refresh().await.unwrap();

    assert_eq!(report.base, ReconcileBase::Store);
    assert_eq!(report.total, 11);
    assert_eq!(report.stats.added, 3);
    assert_eq!(report.stats.preserved, 1);
    assert_eq!(report.stats.refreshed, 7);

    let edited = session.working_set().find_by_key(&key(&["xl", "red"])).unwrap();
    assert_eq!(edited.name, "Red XL Special");
    assert_eq!(edited.id, composite.id);
    assert!(edited.is_modified);
    assert!(edited.is_persisted());

    let green = session.working_set().find_by_key(&key(&["green", "s"])).unwrap();
    assert!(!green.is_active);
    assert!(!green.is_persisted());
}

#[tokio::test]
async fn test_unmodified_records_follow_catalog() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let mut session = session(&store);
    session.refresh().await.unwrap();

    let id = id_of(&session, &["blue", "s"]);
    session.toggle_active(&id).unwrap();
    session.save().await.unwrap();

    let mut catalog = apparel(vec![]);
    for option in &mut catalog.options {
        if option.id == "s" {
            option.stock = 2;
        }
    }
    store.set_catalog(SCOPE, catalog);
    session.refresh().await.unwrap();

    let record = session.working_set().get(&id).unwrap();
    assert_eq!(record.stock, 2);
    assert!(record.is_active);
    assert!(!record.is_modified);
}

#[tokio::test]
async fn test_deactivated_option_orphans_stored_records() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let mut session = session(&store);
    session.refresh().await.unwrap();
    session.save().await.unwrap();
    assert_eq!(store.rows(SCOPE).len(), 8);

    let mut catalog = apparel(vec![]);
    for option in &mut catalog.options {
        if option.id == "blue" {
            option.is_active = false;
        }
    }
    store.set_catalog(SCOPE, catalog);

    let report = session.refresh().await.unwrap();
    assert_eq!(report.stats.orphaned, 3);
    assert_eq!(report.pending_deletes, 3);
    assert_eq!(session.working_set().len(), 5);
    assert!(session.working_set().iter().all(|c| !c.key().contains("blue")));

    let saved = session.save().await.unwrap();
    assert_eq!(saved.deleted, 3);
    assert_eq!(store.rows(SCOPE).len(), 5);

    // Nothing left to delete on the next pass
    let report = session.refresh().await.unwrap();
    assert_eq!(report.stats.orphaned, 0);
    assert_eq!(report.pending_deletes, 0);
}

#[tokio::test]
async fn test_bulk_edit_touches_active_only() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let mut session = session(&store);
    session.refresh().await.unwrap();

    let red = id_of(&session, &["red"]);
    let red_s = id_of(&session, &["red", "s"]);
    session.set_active(&red, true).unwrap();
    session.set_active(&red_s, true).unwrap();

    session.apply_bulk_price(Decimal::new(999, 2)).unwrap();
    session.apply_bulk_stock(1).unwrap();

    for combination in session.working_set().iter() {
        if combination.is_active {
            assert_eq!(combination.price_delta, Decimal::new(999, 2));
            assert_eq!(combination.stock, 1);
            assert!(combination.is_modified);
        } else {
            assert_ne!(combination.price_delta, Decimal::new(999, 2));
            assert!(!combination.is_modified);
        }
    }
    assert_eq!(session.working_set().modified_count(), 2);
}

#[tokio::test]
async fn test_failed_save_leaves_set_unchanged() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let mut session = session(&store);
    session.refresh().await.unwrap();

    let before = session.working_set().clone();
    store.fail_after(3);
    let err = session.save().await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Unavailable(_))));
    assert_eq!(session.working_set(), &before);
    assert!(session.last_saved_at().is_none());

    // Retry after the outage writes each row exactly once
    store.clear_failure();
    session.save().await.unwrap();
    assert_eq!(store.rows(SCOPE).len(), 8);
    assert!(session.working_set().iter().all(|c| c.is_persisted()));
}

#[tokio::test]
async fn test_remove_all_clears_scope() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let mut session = session(&store);
    session.refresh().await.unwrap();
    session.save().await.unwrap();

    let removed = session.remove_all().await.unwrap();
    assert_eq!(removed, 8);
    assert!(session.working_set().is_empty());
    assert!(store.rows(SCOPE).is_empty());
}

#[tokio::test]
async fn test_custom_combination_retained_across_refresh() {
    // Paper > (Weight, Finish): one root, so no generated composite pairs weight with finish
    let paper = AttributeNode::root("paper", "Paper Type");
    let catalog = CatalogSnapshot::new(
        vec![
            AttributeNode::child("weight", "Weight", &paper),
            AttributeNode::child("finish", "Finish", &paper),
            paper,
        ],
        vec![
            option("80g", "weight", "80g", 0, 50),
            option("120g", "weight", "120g", 150, 20),
            option("matte", "finish", "Matte", 75, 30),
        ],
    );

    let store = MemoryStore::new();
    store.set_catalog(SCOPE, catalog.clone());
    let mut session = session(&store);
    assert_eq!(session.refresh().await.unwrap().total, 3);

    session
        .add_custom(&["120g".to_string(), "matte".to_string()])
        .unwrap();
    let err = session
        .add_custom(&["matte".to_string(), "120g".to_string()])
        .unwrap_err();
    assert!(matches!(err, EngineError::CombinationExists(_)));

    let custom = session
        .working_set()
        .find_by_key(&key(&["120g", "matte"]))
        .unwrap()
        .clone();
    assert_eq!(custom.origin, CombinationOrigin::Custom);
    assert_eq!(
        custom.name,
        "Paper Type > Weight - 120g / Paper Type > Finish - Matte"
    );
    assert_eq!(custom.price_delta, Decimal::new(225, 2));
    assert_eq!(custom.stock, 20);
    session.save().await.unwrap();

    let report = session.refresh().await.unwrap();
    assert_eq!(report.stats.retained, 1);
    assert!(session.working_set().get(&custom.id).is_some());

    // Once an option goes away the custom record is orphaned like any other
    let mut reduced = catalog;
    reduced.options.retain(|o| o.id != "matte");
    store.set_catalog(SCOPE, reduced);
    let report = session.refresh().await.unwrap();
    assert_eq!(report.stats.retained, 0);
    assert_eq!(report.stats.orphaned, 2);
}

#[tokio::test]
async fn test_draft_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drafts.redb");
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));

    let edited_id = {
        let mut session = session(&store).with_draft(DraftCache::open(&path).unwrap());
        session.refresh().await.unwrap();
        let id = id_of(&session, &["blue", "xl"]);
        let patch = CombinationPatch {
            notes: Some("ships later".to_string()),
            ..Default::default()
        };
        session.edit(&id, &patch).unwrap();
        id
    };

    // Never saved: the store is still empty
    assert!(store.rows(SCOPE).is_empty());

    let config = EngineConfig::default().with_draft_path(path.to_string_lossy());
    let mut session = VariationSession::new(
        SCOPE,
        config,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
    .with_configured_draft()
    .unwrap();

    let report = session.refresh().await.unwrap();
    assert_eq!(report.base, ReconcileBase::Draft);
    assert_eq!(report.stats.preserved, 1);

    let record = session.working_set().get(&edited_id).unwrap();
    assert_eq!(record.notes.as_deref(), Some("ships later"));
    assert!(record.is_modified);
}

#[tokio::test]
async fn test_removal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drafts.redb");
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));

    {
        let mut session = session(&store).with_draft(DraftCache::open(&path).unwrap());
        session.refresh().await.unwrap();
        session.save().await.unwrap();
        let red = id_of(&session, &["red"]);
        session.remove(&red).unwrap();
        assert_eq!(session.pending_deletes().len(), 1);
    }

    // The delete has not reached the store yet
    assert_eq!(store.rows(SCOPE).len(), 8);

    let mut session = session(&store).with_draft(DraftCache::open(&path).unwrap());
    let report = session.refresh().await.unwrap();
    assert_eq!(report.base, ReconcileBase::Draft);
    assert_eq!(report.total, 7);
    assert_eq!(report.pending_deletes, 1);
    assert!(session.working_set().find_by_key(&key(&["red"])).is_none());

    let saved = session.save().await.unwrap();
    assert_eq!(saved.deleted, 1);
    let rows = store.rows(SCOPE);
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|r| r.key() != &key(&["red"])));
}

#[tokio::test]
async fn test_draft_refresh_keeps_removed_key_out() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let draft = DraftCache::open_in_memory().unwrap();
    let mut session = session(&store).with_draft(draft.clone());
    session.refresh().await.unwrap();
    session.save().await.unwrap();

    let blue_xl = id_of(&session, &["blue", "xl"]);
    session.remove(&blue_xl).unwrap();

    // Repeated refreshes against the draft never bring it back
    for _ in 0..2 {
        let report = session.refresh().await.unwrap();
        assert_eq!(report.base, ReconcileBase::Draft);
        assert_eq!(report.total, 7);
        assert_eq!(report.pending_deletes, 1);
        assert!(session.working_set().get(&blue_xl).is_none());
    }

    // Re-adding the key by hand gives a fresh custom record
    session
        .add_custom(&["xl".to_string(), "blue".to_string()])
        .unwrap();
    session.save().await.unwrap();
    assert!(!draft.has_draft(SCOPE).unwrap());

    let rows = store.rows(SCOPE);
    assert_eq!(rows.len(), 8);
    let row = rows
        .iter()
        .find(|r| r.key() == &key(&["blue", "xl"]))
        .unwrap();
    assert_eq!(row.origin, CombinationOrigin::Custom);
    assert_ne!(row.id, blue_xl);
}

#[tokio::test]
async fn test_invalid_tree_refuses_refresh() {
    let store = MemoryStore::new();
    let a = AttributeNode::root("a", "A");
    let mut orphan = AttributeNode::child("b", "B", &a);
    orphan.parent_id = Some("missing".to_string());
    store.set_catalog(SCOPE, CatalogSnapshot::new(vec![a, orphan], vec![]));

    let mut session = session(&store);
    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, EngineError::Tree(_)));
    assert!(session.working_set().is_empty());
    assert!(session.last_refreshed_at().is_none());
}

#[tokio::test]
async fn test_generation_limit_applies_to_refresh() {
    let store = MemoryStore::new();
    store.set_catalog(SCOPE, apparel(vec![]));
    let mut session = VariationSession::new(
        SCOPE,
        EngineConfig::default().with_max_combinations(5),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    );

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::TooManyCombinations {
            expected: 8,
            limit: 5
        }
    ));
}
