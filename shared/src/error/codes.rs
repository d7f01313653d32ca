//! Unified error codes for the variation engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 6xxx: Variation errors (60xx attribute tree, 61xx combinations)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation requires state the caller has not set up (e.g. no catalog loaded)
    InvalidRequest = 5,

    // ==================== 60xx: Attribute tree ====================
    /// Attribute tree contains a cycle
    AttributeCycle = 6001,
    /// Attribute id appears more than once
    AttributeDuplicateId = 6002,
    /// Attribute depth does not match its parent chain
    AttributeDepthMismatch = 6003,
    /// Attribute references a parent that does not exist
    AttributeParentNotFound = 6004,
    /// Option is attached to an attribute that has children
    OptionOnBranchAttribute = 6005,
    /// Option id appears more than once
    OptionDuplicateId = 6006,
    /// Option references an attribute that does not exist
    OptionAttributeNotFound = 6007,

    // ==================== 61xx: Combinations ====================
    /// A combination with the same option set already exists
    CombinationExists = 6101,
    /// Combination not found in the working set
    CombinationNotFound = 6102,
    /// Selected option not found in the catalog
    OptionNotFound = 6103,
    /// Selected option is inactive
    OptionInactive = 6104,
    /// Two selected options belong to the same attribute
    OptionConflict = 6105,
    /// Generation would exceed the configured combination limit
    TooManyCombinations = 6106,
    /// No option was selected
    EmptySelection = 6107,

    // ==================== 9xxx: System ====================
    /// Storage collaborator failed
    StorageError = 9002,
    /// Record could not be (de)serialized
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::InvalidRequest => "Invalid request",

            // Attribute tree
            ErrorCode::AttributeCycle => "Attribute tree contains a cycle",
            ErrorCode::AttributeDuplicateId => "Attribute id is not unique",
            ErrorCode::AttributeDepthMismatch => "Attribute depth does not match its parent",
            ErrorCode::AttributeParentNotFound => "Attribute parent not found",
            ErrorCode::OptionOnBranchAttribute => "Options can only belong to leaf attributes",
            ErrorCode::OptionDuplicateId => "Option id is not unique",
            ErrorCode::OptionAttributeNotFound => "Option attribute not found",

            // Combinations
            ErrorCode::CombinationExists => "Combination already exists",
            ErrorCode::CombinationNotFound => "Combination not found",
            ErrorCode::OptionNotFound => "Option not found",
            ErrorCode::OptionInactive => "Option is inactive",
            ErrorCode::OptionConflict => "Only one option per attribute can be selected",
            ErrorCode::TooManyCombinations => "Too many combinations",
            ErrorCode::EmptySelection => "At least one option must be selected",

            // System
            ErrorCode::StorageError => "Storage error",
            ErrorCode::SerializationError => "Serialization error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            5 => Ok(ErrorCode::InvalidRequest),

            // Attribute tree
            6001 => Ok(ErrorCode::AttributeCycle),
            6002 => Ok(ErrorCode::AttributeDuplicateId),
            6003 => Ok(ErrorCode::AttributeDepthMismatch),
            6004 => Ok(ErrorCode::AttributeParentNotFound),
            6005 => Ok(ErrorCode::OptionOnBranchAttribute),
            6006 => Ok(ErrorCode::OptionDuplicateId),
            6007 => Ok(ErrorCode::OptionAttributeNotFound),

            // Combinations
            6101 => Ok(ErrorCode::CombinationExists),
            6102 => Ok(ErrorCode::CombinationNotFound),
            6103 => Ok(ErrorCode::OptionNotFound),
            6104 => Ok(ErrorCode::OptionInactive),
            6105 => Ok(ErrorCode::OptionConflict),
            6106 => Ok(ErrorCode::TooManyCombinations),
            6107 => Ok(ErrorCode::EmptySelection),

            // System
            9002 => Ok(ErrorCode::StorageError),
            9003 => Ok(ErrorCode::SerializationError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
