//! Data models for the variation engine
//!
//! Plain serde types shared between the engine and its storage collaborators.

pub mod attribute;
pub mod catalog;
pub mod combination;
pub mod option;

pub use attribute::AttributeNode;
pub use catalog::CatalogSnapshot;
pub use combination::{Combination, CombinationKey, CombinationOrigin, CombinationPatch};
pub use option::OptionValue;
