//! Error types for the pwdb core library.

use thiserror::Error;

use crate::field_registry::{FieldType, FilterScope};
use crate::filter::Rule;

/// Problems with a filter expression, detected when it is built or loaded.
///
/// These are never coerced into a "best effort" filter: a caller that gets
/// one back has to fix the filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The rule is not in the permitted set for the field's match type
    #[error("rule {rule} is not permitted for field {field}")]
    RuleNotPermitted { field: FieldType, rule: Rule },

    /// A field was used in a criteria list of another scope
    #[error("field {field} does not belong to the {scope} criteria")]
    FieldOutOfScope { field: FieldType, scope: FilterScope },

    /// The operand payload does not fit the field or rule
    #[error("operand does not fit field {field}: {reason}")]
    OperandMismatch { field: FieldType, reason: &'static str },

    /// `between` with the lower bound not strictly below the upper bound
    #[error("between on field {field} needs the first value below the second")]
    InvertedRange { field: FieldType },

    /// A numeric operand outside the field's declared range
    #[error("value {value} for field {field} is outside [{min}, {max}]")]
    OutOfRange {
        field: FieldType,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The day count of a will-expire rule outside [1, 3650]
    #[error("expiry window of {days} days is outside [1, 3650]")]
    ExpiryDaysOutOfRange { days: i64 },

    /// A nested criteria list with no active, complete criterion
    #[error("nested {scope} filter has no active criteria")]
    EmptyNestedFilter { scope: FilterScope },

    /// A nested row that has no nested criteria list to evaluate
    #[error("row for {scope} has no nested filter")]
    MissingNestedFilter { scope: FilterScope },

    /// A nested criteria list that no row refers to
    #[error("nested {scope} filter is not referenced by any row")]
    UnreferencedNestedFilter { scope: FilterScope },

    /// More than one row, or more than one nested list, of the same kind
    #[error("only one {scope} nested filter is allowed")]
    DuplicateNestedSlot { scope: FilterScope },

    /// A stored filter without a name
    #[error("stored filter has an empty name")]
    EmptyFilterName,
}

/// Preconditions that must hold before a reconcile operation starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// Two entries share the same group/title/user key
    #[error("{database} database has duplicate entries for \u{ab}{group}\u{bb} \u{ab}{title}\u{bb} \u{ab}{user}\u{bb}")]
    DuplicateGtu {
        database: &'static str,
        group: String,
        title: String,
        user: String,
    },
}

/// Errors that can occur during core operations.
///
/// This enum is exposed to Swift/Kotlin via UniFFI as a flat error type,
/// meaning the error variants are exposed as simple enum cases with string messages.
#[derive(Error, Debug, Clone)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error))]
#[cfg_attr(feature = "uniffi", uniffi(flat_error))]
pub enum CoreError {
    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Invalid filter expression
    #[error("Invalid filter: {0}")]
    Validation(#[from] ValidationError),

    /// Reconcile precondition not met
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// General error
    #[error("Error: {0}")]
    General(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::JsonError(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
