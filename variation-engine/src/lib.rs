//! Variation Engine - product variation combinations
//!
//! Turns a forest of variation attributes ("Paper Type > Weight", "Color")
//! and their option values into sellable variation records, and merges a
//! regenerated set with earlier, possibly edited, records without losing
//! edits.
//!
//! # Module layout
//!
//! ```text
//! variation-engine/src/
//! ├── core/          # configuration, errors
//! ├── tree/          # attribute forest arena, option catalog, validation
//! ├── generator/     # simple + composite enumeration, counting
//! ├── reconcile/     # transient vs persisted merge
//! ├── working_set.rs # activation, bulk edits, custom combinations
//! ├── store/         # collaborator traits, memory store, redb draft cache
//! ├── session.rs     # refresh / save orchestration per scope
//! └── utils/         # logging
//! ```
//!
//! # Example
//!
//! ```
//! use shared::models::{AttributeNode, CatalogSnapshot, OptionValue};
//! use variation_engine::{EngineConfig, VariationTree, generator};
//!
//! let snapshot = CatalogSnapshot::new(
//!     vec![AttributeNode::root("color", "Color"), AttributeNode::root("size", "Size")],
//!     vec![
//!         OptionValue::new("red", "color", "Red"),
//!         OptionValue::new("blue", "color", "Blue"),
//!         OptionValue::new("s", "size", "S"),
//!     ],
//! );
//! let tree = VariationTree::load(&snapshot).unwrap();
//! let combinations = generator::generate(&tree, &EngineConfig::default()).unwrap();
//! assert_eq!(combinations.len(), 5);
//! ```

pub mod core;
pub mod generator;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod tree;
pub mod utils;
pub mod working_set;

pub use core::{EngineConfig, EngineError, EngineResult};
pub use generator::{CombinationGenerator, build_custom, count_combinations};
pub use reconcile::{ReconcileOutcome, ReconcileStats, reconcile, reconcile_retaining};
pub use session::{ReconcileBase, RefreshReport, SaveReport, VariationSession};
pub use store::{
    AttributeSource, CombinationStore, DraftCache, MemoryStore, StoreError, StoreResult,
};
pub use tree::{AttributeForest, OptionCatalog, TreeError, VariationTree};
pub use working_set::WorkingSet;

pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
