//! Shared types for the variation engine
//!
//! Data models (attributes, options, combinations), the unified error
//! system and small utilities used by the engine and its storage
//! collaborators.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{
    AttributeNode, CatalogSnapshot, Combination, CombinationKey, CombinationOrigin,
    CombinationPatch, OptionValue,
};
