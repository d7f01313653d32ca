//! Engine errors and their mapping onto the unified error codes

use crate::store::StoreError;
use crate::tree::TreeError;
use shared::error::{AppError, ErrorCode};
use shared::models::CombinationKey;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid attribute tree: {0}")]
    Tree(#[from] TreeError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog not loaded")]
    CatalogNotLoaded,

    #[error("Combination not found: {0}")]
    CombinationNotFound(String),

    #[error("Combination already exists: {0}")]
    CombinationExists(CombinationKey),

    #[error("Option not found: {0}")]
    OptionNotFound(String),

    #[error("Option is inactive: {0}")]
    OptionInactive(String),

    #[error("Options {first} and {second} both belong to attribute {attribute_id}")]
    OptionConflict {
        attribute_id: String,
        first: String,
        second: String,
    },

    #[error("At least one option must be selected")]
    EmptySelection,

    #[error("Generation would produce {expected} combinations, limit is {limit}")]
    TooManyCombinations { expected: u64, limit: usize },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl TreeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TreeError::DuplicateAttribute(_) => ErrorCode::AttributeDuplicateId,
            TreeError::ParentNotFound { .. } => ErrorCode::AttributeParentNotFound,
            TreeError::Cycle(_) => ErrorCode::AttributeCycle,
            TreeError::DepthMismatch { .. } => ErrorCode::AttributeDepthMismatch,
            TreeError::DuplicateOption(_) => ErrorCode::OptionDuplicateId,
            TreeError::OptionAttributeNotFound { .. } => ErrorCode::OptionAttributeNotFound,
            TreeError::OptionOnBranch { .. } => ErrorCode::OptionOnBranchAttribute,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Tree(e) => AppError::with_message(e.code(), message),
            EngineError::Store(e) => {
                tracing::error!(error = %e, "Storage error occurred");
                let code = match e {
                    StoreError::Serialization(_) => ErrorCode::SerializationError,
                    _ => ErrorCode::StorageError,
                };
                AppError::with_message(code, message)
            }
            EngineError::CatalogNotLoaded => AppError::with_message(ErrorCode::InvalidRequest, message),
            EngineError::CombinationNotFound(id) => {
                AppError::with_message(ErrorCode::CombinationNotFound, message).with_detail("id", id)
            }
            EngineError::CombinationExists(key) => {
                AppError::with_message(ErrorCode::CombinationExists, message)
                    .with_detail("key", key.canonical())
            }
            EngineError::OptionNotFound(id) => {
                AppError::with_message(ErrorCode::OptionNotFound, message).with_detail("id", id)
            }
            EngineError::OptionInactive(id) => {
                AppError::with_message(ErrorCode::OptionInactive, message).with_detail("id", id)
            }
            EngineError::OptionConflict { attribute_id, .. } => {
                AppError::with_message(ErrorCode::OptionConflict, message)
                    .with_detail("attribute_id", attribute_id)
            }
            EngineError::EmptySelection => AppError::with_message(ErrorCode::EmptySelection, message),
            EngineError::TooManyCombinations { expected, limit } => {
                AppError::with_message(ErrorCode::TooManyCombinations, message)
                    .with_detail("expected", expected)
                    .with_detail("limit", limit)
            }
        }
    }
}
