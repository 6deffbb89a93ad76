//! Password Database Core Library
//!
//! Platform-independent core logic for a password database, including:
//! - **filter**: Entry filter expressions, evaluation and saved filters
//! - **reconcile**: Compare, synchronize and merge two databases
//! - **field_registry**: Field metadata, permitted rules and default field masks
//!
//! Entries arrive already decrypted. Every operation is also available with
//! JSON input and output so that each platform (desktop, browser, mobile)
//! can handle its own storage and call this library for the core logic.
//!
//! # Example (conceptual)
//! ```ignore
//! // Filter example
//! let filter = FilterExpression::builder()
//!     .and(Predicate::text(FieldType::Title, Rule::Contains, "vpn"))
//!     .build()?;
//! let matches = filter_collection(&filter, &db.entries, &EvalContext::default());
//!
//! // Compare example
//! let report = compare(&current.entries, &other.entries, &CompareOptions::default());
//!
//! // Merge example (adds entries whose group/title/user is new)
//! let report = merge(&mut primary, &secondary, &MergeOptions::default())?;
//! ```

pub mod entry;
pub mod error;
pub mod field_registry;
pub mod filter;
pub mod reconcile;

pub use entry::{
    Attachment, Database, Dca, Entry, EntryStatus, EntryType, GtuKey, HistoryItem,
    PasswordHistory, PasswordPolicy,
};
pub use error::{CoreError, CoreResult, PreconditionError, ValidationError};
pub use field_registry::{
    default_field_mask, default_field_mask_json, permitted_rules, rule_permitted, FieldMask,
    FieldType, FilterScope, MaskContext, MatchType, SizeUnit,
};
pub use filter::{
    evaluate_filter, filter_collection, filter_entries, filter_entries_json, validate_filter_json,
    Criteria, EvalContext, FilterBuilder, FilterExpression, FilterPool, FilterStore, LogicOp,
    Operand, Predicate, Rule, StoredFilter, Term,
};
pub use reconcile::{
    compare, compare_cancellable, compare_json, merge, merge_json, synchronize,
    synchronize_cancellable, synchronize_json, CancelFlag, CompareBucket, CompareOptions,
    CompareRecord, CompareReport, MergeOptions, MergeReport, RunOutcome, SubgroupField,
    SubgroupFilter, SyncOptions, SyncReport,
};

/// Version of the pwdb-core library.
pub fn get_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for desktop hosts
#[cfg(feature = "ffi")]
pub mod ffi;

// UniFFI bindings for Swift/Kotlin
#[cfg(feature = "uniffi")]
pub mod uniffi_api;

#[cfg(feature = "uniffi")]
pub use uniffi_api::*;

// UniFFI scaffolding - generates the FFI glue code
#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();
