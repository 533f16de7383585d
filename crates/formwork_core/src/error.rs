//! Formwork error types

use thiserror::Error;

/// Errors raised by the binding engine
///
/// Only configuration mistakes surface here. Runtime conditions such as a
/// target lacking a property, or a write to an unbound item, are tolerated
/// and logged instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The property accessor text is not a direct member reference
    #[error("Invalid property expression: {0:?}")]
    InvalidPropertyExpression(String),

    /// An interaction style read from configuration is not supported
    #[error("Unsupported {kind} input type: {value:?}")]
    UnsupportedInputType { kind: &'static str, value: String },

    /// A pick action addressed an option that does not exist
    #[error("Option index {index} out of range (item has {len} options)")]
    OptionOutOfRange { index: usize, len: usize },

    /// A value was picked that is not part of the item's source
    #[error("Picked value is not part of the option source")]
    UnknownOption,

    /// The item does not allow its value to be cleared
    #[error("Item value cannot be cleared")]
    NotClearable,

    /// The item kind has no such interactive action
    #[error("{kind} items do not support the {action} action")]
    UnsupportedAction {
        kind: &'static str,
        action: &'static str,
    },

    /// The untyped value contract received a value of another type
    #[error("Value type mismatch: expected {expected}")]
    ValueTypeMismatch { expected: &'static str },
}

/// Result type for formwork operations
pub type Result<T> = std::result::Result<T, FormError>;
