//! Option catalog indexed by leaf attribute

use super::{AttributeForest, TreeError};
use shared::models::OptionValue;
use std::collections::HashMap;

/// Option values grouped by their owning leaf attribute
#[derive(Debug, Clone, Default)]
pub struct OptionCatalog {
    options: Vec<OptionValue>,
    index: HashMap<String, usize>,
    /// attribute id -> option positions, in display order
    by_attribute: HashMap<String, Vec<usize>>,
}

impl OptionCatalog {
    /// Index options against a validated forest
    ///
    /// Option ids must be unique across the whole catalog and every option
    /// must belong to a leaf attribute.
    pub fn build(forest: &AttributeForest, options: &[OptionValue]) -> Result<Self, TreeError> {
        let mut index = HashMap::with_capacity(options.len());
        let mut by_attribute: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, option) in options.iter().enumerate() {
            if !forest.contains(&option.attribute_id) {
                return Err(TreeError::OptionAttributeNotFound {
                    option_id: option.id.clone(),
                    attribute_id: option.attribute_id.clone(),
                });
            }
            if !forest.is_leaf(&option.attribute_id) {
                return Err(TreeError::OptionOnBranch {
                    option_id: option.id.clone(),
                    attribute_id: option.attribute_id.clone(),
                });
            }
            if index.insert(option.id.clone(), i).is_some() {
                return Err(TreeError::DuplicateOption(option.id.clone()));
            }
            by_attribute
                .entry(option.attribute_id.clone())
                .or_default()
                .push(i);
        }

        for positions in by_attribute.values_mut() {
            positions.sort_by_key(|&i| options[i].display_order);
        }

        Ok(Self {
            options: options.to_vec(),
            index,
            by_attribute,
        })
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&OptionValue> {
        self.index.get(id).map(|&i| &self.options[i])
    }

    /// Exists and is active
    pub fn is_live(&self, id: &str) -> bool {
        self.get(id).is_some_and(|o| o.is_active)
    }

    /// Active options of an attribute, in display order
    pub fn active_options(&self, attribute_id: &str) -> Vec<&OptionValue> {
        self.by_attribute
            .get(attribute_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| &self.options[i])
                    .filter(|o| o.is_active)
                    .collect()
            })
            .unwrap_or_default()
    }
}
