//! Catalog Snapshot Model

use super::{AttributeNode, OptionValue};
use serde::{Deserialize, Serialize};

/// Attribute forest and option list of one scope, as read from the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub attributes: Vec<AttributeNode>,
    pub options: Vec<OptionValue>,
}

impl CatalogSnapshot {
    pub fn new(attributes: Vec<AttributeNode>, options: Vec<OptionValue>) -> Self {
        Self {
            attributes,
            options,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
