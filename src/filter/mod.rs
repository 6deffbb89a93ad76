//! Entry filters: criteria over entry fields combined into expressions.
//!
//! A [`FilterExpression`] is an ordered list of [`Predicate`]s joined by
//! AND/OR and folded strictly left to right, plus optional nested criteria
//! for the password history, password policy and attachment of an entry.
//! Expressions are validated when built or loaded; evaluation itself is pure.
//!
//! # Example
//! ```ignore
//! let filter = FilterExpression::builder()
//!     .and(Predicate::text(FieldType::Title, Rule::Contains, "vpn"))
//!     .or(Predicate::will_expire_within(30))
//!     .build()?;
//! let hits = filter_collection(&filter, &entries, &EvalContext::default());
//! ```

mod evaluate;
mod expression;
mod matching;
mod predicate;
mod rule;
mod storage;


use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::Entry;
use crate::error::CoreResult;

pub use evaluate::{evaluate_filter, filter_collection, EvalContext, FilterEvaluator};
pub use expression::{Criteria, FilterBuilder, FilterExpression};
pub use predicate::{LogicOp, Operand, Predicate, Term, EXPIRY_DAYS_RANGE, MAX_RELATIVE_DAYS};
pub use rule::Rule;
pub use storage::{predefined, FilterPool, FilterStore, StoredFilter};

pub(crate) use matching::match_text;

/// Input for filtering a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterInput {
    /// Filter to apply; validated before use
    pub filter: FilterExpression,
    /// Entries to filter
    pub entries: Vec<Entry>,
    /// Evaluation time and defaults
    #[serde(default)]
    pub context: EvalContext,
}

/// Output from filtering a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOutput {
    /// UUIDs of matching entries, in input order
    pub matched_uuids: Vec<Uuid>,
    /// Number of entries examined
    pub total: u32,
}

/// Validation result for a single expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutput {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Validate the filter and return the entries that pass it.
pub fn filter_entries(input: FilterInput) -> CoreResult<FilterOutput> {
    input.filter.validate()?;
    let matched_uuids = filter_collection(&input.filter, &input.entries, &input.context)
        .into_iter()
        .map(|e| e.uuid)
        .collect();
    Ok(FilterOutput {
        matched_uuids,
        total: input.entries.len() as u32,
    })
}

/// Filter a JSON string input and return JSON string output.
/// Convenience function for FFI.
pub fn filter_entries_json(input_json: &str) -> CoreResult<String> {
    let input: FilterInput = serde_json::from_str(input_json)?;
    let output = filter_entries(input)?;
    let output_json = serde_json::to_string(&output)?;
    Ok(output_json)
}

/// Validate a JSON filter expression. Malformed JSON is an error; an invalid
/// but well-formed expression is reported in the output.
pub fn validate_filter_json(filter_json: &str) -> CoreResult<String> {
    let filter: FilterExpression = serde_json::from_str(filter_json)?;
    let output = match filter.validate() {
        Ok(()) => ValidationOutput {
            valid: true,
            error: None,
        },
        Err(e) => ValidationOutput {
            valid: false,
            error: Some(e.to_string()),
        },
    };
    Ok(serde_json::to_string(&output)?)
}
