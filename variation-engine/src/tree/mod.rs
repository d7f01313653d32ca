//! Attribute tree and option catalog
//!
//! [`VariationTree::load`] is the single entry point that turns a raw
//! [`CatalogSnapshot`] into validated, indexed structures. Every
//! structural problem is reported here, so the generator never sees a
//! cyclic or inconsistent tree.

mod catalog;
mod forest;

pub use catalog::OptionCatalog;
pub use forest::AttributeForest;

use shared::models::CatalogSnapshot;
use thiserror::Error;

/// Structural errors in the attribute forest or option catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Duplicate attribute id: {0}")]
    DuplicateAttribute(String),

    #[error("Attribute {id} references unknown parent {parent_id}")]
    ParentNotFound { id: String, parent_id: String },

    #[error("Attribute {0} is part of a cycle")]
    Cycle(String),

    #[error("Attribute {id} has depth {found}, expected {expected}")]
    DepthMismatch { id: String, expected: u32, found: u32 },

    #[error("Duplicate option id: {0}")]
    DuplicateOption(String),

    #[error("Option {option_id} references unknown attribute {attribute_id}")]
    OptionAttributeNotFound {
        option_id: String,
        attribute_id: String,
    },

    #[error("Option {option_id} is attached to attribute {attribute_id}, which has children")]
    OptionOnBranch {
        option_id: String,
        attribute_id: String,
    },
}

/// Validated attribute forest together with its option catalog
#[derive(Debug, Clone)]
pub struct VariationTree {
    forest: AttributeForest,
    options: OptionCatalog,
}

impl VariationTree {
    /// Validate and index a catalog snapshot
    pub fn load(snapshot: &CatalogSnapshot) -> Result<Self, TreeError> {
        let forest = AttributeForest::build(&snapshot.attributes)?;
        let options = OptionCatalog::build(&forest, &snapshot.options)?;

        tracing::debug!(
            attributes = forest.len(),
            roots = forest.root_count(),
            options = options.len(),
            "Variation tree loaded"
        );

        Ok(Self { forest, options })
    }

    pub fn forest(&self) -> &AttributeForest {
        &self.forest
    }

    pub fn options(&self) -> &OptionCatalog {
        &self.options
    }
}
