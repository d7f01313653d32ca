//! Activation & Bulk-Edit Layer
//!
//! [`WorkingSet`] is an immutable-by-convention list of combinations. Every
//! operation borrows the current set and returns a new one, so a failed
//! operation leaves the caller's set untouched.
//!
//! Activation changes do not mark records as modified; field edits (direct
//! or bulk) do.

use crate::core::{EngineConfig, EngineError, EngineResult};
use crate::generator::build_custom;
use crate::tree::VariationTree;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Combination, CombinationKey, CombinationPatch};
use std::collections::{HashMap, HashSet};

/// Current set of combinations for one scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingSet {
    combinations: Vec<Combination>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, dropping later records whose option set repeats an earlier one
    pub fn from_combinations(combinations: Vec<Combination>) -> Self {
        let mut seen = HashSet::with_capacity(combinations.len());
        let mut kept = Vec::with_capacity(combinations.len());
        for combination in combinations {
            if seen.insert(combination.selected_option_ids.clone()) {
                kept.push(combination);
            } else {
                tracing::debug!(
                    key = %combination.selected_option_ids,
                    id = %combination.id,
                    "Duplicate combination dropped"
                );
            }
        }
        Self { combinations: kept }
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combination> {
        self.combinations.iter()
    }

    pub fn into_vec(self) -> Vec<Combination> {
        self.combinations
    }

    pub fn get(&self, id: &str) -> Option<&Combination> {
        self.combinations.iter().find(|c| c.id == id)
    }

    pub fn find_by_key(&self, key: &CombinationKey) -> Option<&Combination> {
        self.combinations.iter().find(|c| c.key() == key)
    }

    pub fn active(&self) -> impl Iterator<Item = &Combination> {
        self.combinations.iter().filter(|c| c.is_active)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn modified_count(&self) -> usize {
        self.combinations.iter().filter(|c| c.is_modified).count()
    }

    // ========== Activation ==========

    /// Flip the activation flag of one combination
    pub fn toggle_active(&self, id: &str) -> EngineResult<Self> {
        self.update_one(id, |c| c.is_active = !c.is_active)
    }

    pub fn set_active(&self, id: &str, active: bool) -> EngineResult<Self> {
        self.update_one(id, |c| c.is_active = active)
    }

    pub fn activate_all(&self) -> Self {
        self.update_all(|c| c.is_active = true)
    }

    pub fn deactivate_all(&self) -> Self {
        self.update_all(|c| c.is_active = false)
    }

    // ========== Edits ==========

    /// Assign `price_delta` to every active combination
    pub fn apply_bulk_price(&self, price_delta: Decimal) -> Self {
        let next = self.update_active(|c| c.price_delta = price_delta);
        tracing::info!(%price_delta, touched = next.active_count(), "Bulk price applied");
        next
    }

    /// Assign `stock` to every active combination
    pub fn apply_bulk_stock(&self, stock: u32) -> Self {
        let next = self.update_active(|c| c.stock = stock);
        tracing::info!(stock, touched = next.active_count(), "Bulk stock applied");
        next
    }

    /// Apply a partial edit to one combination
    pub fn edit(&self, id: &str, patch: &CombinationPatch) -> EngineResult<Self> {
        self.update_one(id, |c| {
            c.apply_patch(patch);
        })
    }

    // ========== Membership ==========

    /// Add a user-assembled combination
    ///
    /// Rejected with [`EngineError::CombinationExists`] when a combination with
    /// the same option set is already present.
    pub fn add_custom(
        &self,
        tree: &VariationTree,
        config: &EngineConfig,
        option_ids: &[String],
    ) -> EngineResult<Self> {
        let custom = build_custom(tree, config, option_ids)?;
        if self.find_by_key(custom.key()).is_some() {
            return Err(EngineError::CombinationExists(custom.selected_option_ids));
        }

        tracing::info!(key = %custom.key(), name = %custom.name, "Custom combination added");
        let mut combinations = self.combinations.clone();
        combinations.push(custom);
        Ok(Self { combinations })
    }

    /// Remove one combination, returning it alongside the new set
    pub fn remove(&self, id: &str) -> EngineResult<(Self, Combination)> {
        let position = self
            .combinations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| EngineError::CombinationNotFound(id.to_string()))?;

        let mut combinations = self.combinations.clone();
        let removed = combinations.remove(position);
        Ok((Self { combinations }, removed))
    }

    /// Empty set plus every record that was in it
    pub fn remove_all(&self) -> (Self, Vec<Combination>) {
        (Self::new(), self.combinations.clone())
    }

    /// Record storage ids assigned by a save (combination id -> storage id)
    pub fn with_storage_ids(&self, assigned: &HashMap<String, String>) -> Self {
        self.update_all(|c| {
            if let Some(storage_id) = assigned.get(&c.id) {
                c.storage_id = Some(storage_id.clone());
            }
        })
    }

    fn update_one<F>(&self, id: &str, apply: F) -> EngineResult<Self>
    where
        F: FnOnce(&mut Combination),
    {
        let mut combinations = self.combinations.clone();
        let target = combinations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::CombinationNotFound(id.to_string()))?;
        apply(target);
        Ok(Self { combinations })
    }

    fn update_all<F>(&self, apply: F) -> Self
    where
        F: Fn(&mut Combination),
    {
        let mut combinations = self.combinations.clone();
        combinations.iter_mut().for_each(apply);
        Self { combinations }
    }

    /// Field assignment on the active subset; each touched record becomes modified
    fn update_active<F>(&self, apply: F) -> Self
    where
        F: Fn(&mut Combination),
    {
        self.update_all(|c| {
            if c.is_active {
                apply(c);
                c.is_modified = true;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{AttributeNode, CatalogSnapshot, CombinationOrigin, OptionValue};

    fn combination(id: &str, options: &[&str], active: bool) -> Combination {
        Combination {
            id: id.to_string(),
            selected_option_ids: CombinationKey::from_ids(options.iter().copied()),
            attribute_paths: Vec::new(),
            is_composite: options.len() > 1,
            name: id.to_string(),
            sku: None,
            barcode: None,
            image_url: None,
            price_delta: Decimal::new(100, 2),
            stock: 10,
            notes: None,
            is_active: active,
            origin: CombinationOrigin::Automatic,
            is_modified: false,
            storage_id: None,
        }
    }

    fn sample() -> WorkingSet {
        WorkingSet::from_combinations(vec![
            combination("c1", &["red"], true),
            combination("c2", &["blue"], false),
            combination("c3", &["red", "s"], true),
        ])
    }

    #[test]
    fn test_from_combinations_dedups_by_key() {
        let set = WorkingSet::from_combinations(vec![
            combination("c1", &["red", "s"], false),
            combination("c2", &["s", "red"], true),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.combinations()[0].id, "c1");
    }

    #[test]
    fn test_toggle_active_does_not_modify() {
        let set = sample();
        let next = set.toggle_active("c2").unwrap();

        assert!(next.get("c2").unwrap().is_active);
        assert!(!next.get("c2").unwrap().is_modified);
        // Original untouched
        assert!(!set.get("c2").unwrap().is_active);

        let back = next.toggle_active("c2").unwrap();
        assert!(!back.get("c2").unwrap().is_active);
    }

    #[test]
    fn test_toggle_unknown_id() {
        let err = sample().toggle_active("missing").unwrap_err();
        assert!(matches!(err, EngineError::CombinationNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_activate_and_deactivate_all() {
        let all = sample().activate_all();
        assert_eq!(all.active_count(), 3);
        assert_eq!(all.modified_count(), 0);
        assert_eq!(all.deactivate_all().active_count(), 0);
    }

    #[test]
    fn test_bulk_price_touches_active_only() {
        let set = sample().apply_bulk_price(Decimal::new(250, 2));

        assert_eq!(set.get("c1").unwrap().price_delta, Decimal::new(250, 2));
        assert_eq!(set.get("c3").unwrap().price_delta, Decimal::new(250, 2));
        assert!(set.get("c1").unwrap().is_modified);

        let inactive = set.get("c2").unwrap();
        assert_eq!(inactive.price_delta, Decimal::new(100, 2));
        assert!(!inactive.is_modified);
    }

    #[test]
    fn test_bulk_stock_touches_active_only() {
        let set = sample().apply_bulk_stock(0);
        assert_eq!(set.get("c1").unwrap().stock, 0);
        assert_eq!(set.get("c2").unwrap().stock, 10);
        assert_eq!(set.modified_count(), 2);
    }

    #[test]
    fn test_edit_marks_modified() {
        let patch = CombinationPatch {
            name: Some("Custom Name".to_string()),
            ..Default::default()
        };
        let set = sample().edit("c2", &patch).unwrap();
        let record = set.get("c2").unwrap();
        assert_eq!(record.name, "Custom Name");
        assert!(record.is_modified);
    }

    #[test]
    fn test_remove_and_remove_all() {
        let set = sample();
        let (next, removed) = set.remove("c1").unwrap();
        assert_eq!(removed.id, "c1");
        assert_eq!(next.len(), 2);
        assert!(set.remove("ghost").is_err());

        let (empty, all) = next.remove_all();
        assert!(empty.is_empty());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_with_storage_ids() {
        let assigned = HashMap::from([("c1".to_string(), "combination:1".to_string())]);
        let set = sample().with_storage_ids(&assigned);
        assert_eq!(set.get("c1").unwrap().storage_id.as_deref(), Some("combination:1"));
        assert!(set.get("c2").unwrap().storage_id.is_none());
    }

    #[test]
    fn test_add_custom_rejects_existing_key() {
        let snapshot = CatalogSnapshot::new(
            vec![
                AttributeNode::root("color", "Color"),
                AttributeNode::root("size", "Size"),
            ],
            vec![
                OptionValue::new("red", "color", "Red"),
                OptionValue::new("s", "size", "S"),
            ],
        );
        let tree = VariationTree::load(&snapshot).unwrap();
        let config = EngineConfig::default();

        let set = WorkingSet::from_combinations(vec![combination("c1", &["red"], false)]);
        let err = set
            .add_custom(&tree, &config, &["red".to_string()])
            .unwrap_err();
        assert!(matches!(err, EngineError::CombinationExists(_)));

        let next = set
            .add_custom(&tree, &config, &["s".to_string(), "red".to_string()])
            .unwrap();
        assert_eq!(next.len(), 2);
        let custom = next
            .find_by_key(&CombinationKey::from_ids(["red", "s"]))
            .unwrap();
        assert_eq!(custom.origin, CombinationOrigin::Custom);
        assert!(custom.is_active);
    }
}
