//! Reconciliation of two entry databases: compare, synchronize and merge.
//!
//! All three operations match entries by their group/title/user key. When a
//! key occurs more than once on the other side, the candidate with the same
//! UUID wins. An optional [`SubgroupFilter`] restricts both sides before
//! matching.
//!
//! Compare and synchronize have `*_cancellable` variants that poll a
//! [`CancelFlag`] between entries and return [`RunOutcome::Cancelled`] with
//! the partial result.

mod compare;
mod fields;
mod merge;
mod policy;
mod synchronize;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::entry::{Database, Entry, GtuKey};
use crate::error::{CoreResult, ValidationError};
use crate::field_registry::{rule_permitted, FieldType};
use crate::filter::{match_text, Operand, Rule};

pub use compare::{
    compare, compare_cancellable, CompareBucket, CompareOptions, CompareRecord, CompareReport,
};
pub use merge::{merge, MergeOptions, MergeReport};
pub use policy::PolicyRenameMap;
pub use synchronize::{synchronize, synchronize_cancellable, SyncOptions, SyncReport};

/// Fields a subgroup restriction can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgroupField {
    Group,
    GroupTitle,
    Title,
    User,
    Url,
    Notes,
}

impl SubgroupField {
    pub fn field_type(self) -> FieldType {
        match self {
            SubgroupField::Group => FieldType::Group,
            SubgroupField::GroupTitle => FieldType::GroupTitle,
            SubgroupField::Title => FieldType::Title,
            SubgroupField::User => FieldType::User,
            SubgroupField::Url => FieldType::Url,
            SubgroupField::Notes => FieldType::Notes,
        }
    }
}

/// Restricts a reconcile run to entries whose field matches a text rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgroupFilter {
    pub field: SubgroupField,
    pub rule: Rule,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl SubgroupFilter {
    /// Case-insensitive restriction.
    pub fn new(field: SubgroupField, rule: Rule, value: &str) -> Self {
        SubgroupFilter {
            field,
            rule,
            value: value.to_string(),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let field = self.field.field_type();
        if !rule_permitted(field, self.rule) {
            return Err(ValidationError::RuleNotPermitted {
                field,
                rule: self.rule,
            });
        }
        Ok(())
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        let group_title;
        let value = match self.field {
            SubgroupField::Group => &entry.group,
            SubgroupField::GroupTitle => {
                group_title = entry.group_title();
                &group_title
            }
            SubgroupField::Title => &entry.title,
            SubgroupField::User => &entry.user,
            SubgroupField::Url => &entry.url,
            SubgroupField::Notes => &entry.notes,
        };
        let operand = Operand::Text {
            value: self.value.clone(),
            case_sensitive: self.case_sensitive,
        };
        match_text(value, self.rule, &operand)
    }
}

/// Whether an entry takes part in a run.
pub(crate) fn admits(subgroup: Option<&SubgroupFilter>, entry: &Entry) -> bool {
    subgroup.map_or(true, |s| s.matches(entry))
}

/// Cooperative cancellation for long reconcile runs.
///
/// Clones share the same flag, so a UI thread can keep one and cancel a run
/// working with another.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a cancellable run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Completed(T),
    /// Stopped early; holds what was computed up to that point
    Cancelled(T),
}

impl<T> RunOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            RunOutcome::Completed(t) | RunOutcome::Cancelled(t) => t,
        }
    }
}

/// GTU lookup over one side of a run.
///
/// Stores indices so the indexed slice stays free for later mutation.
pub(crate) struct GtuIndex {
    by_key: HashMap<GtuKey, Vec<(usize, Uuid)>>,
}

impl GtuIndex {
    /// Index the entries that `keep` admits.
    pub(crate) fn new(entries: &[Entry], keep: impl Fn(&Entry) -> bool) -> Self {
        let mut by_key: HashMap<GtuKey, Vec<(usize, Uuid)>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate().filter(|(_, e)| keep(e)) {
            by_key.entry(entry.gtu()).or_default().push((i, entry.uuid));
        }
        GtuIndex { by_key }
    }

    /// Claim the match for `entry`, preferring the candidate with its UUID.
    pub(crate) fn take(&mut self, entry: &Entry) -> Option<usize> {
        let candidates = self.by_key.get_mut(&entry.gtu())?;
        if candidates.is_empty() {
            return None;
        }
        let pos = candidates
            .iter()
            .position(|(_, uuid)| *uuid == entry.uuid)
            .unwrap_or(0);
        Some(candidates.remove(pos).0)
    }

    /// Indices never claimed, in ascending order.
    pub(crate) fn remaining(&self) -> Vec<usize> {
        let mut left: Vec<usize> = self
            .by_key
            .values()
            .flat_map(|c| c.iter().map(|(i, _)| *i))
            .collect();
        left.sort_unstable();
        left
    }
}

/// Input for comparing two entry collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareInput {
    /// Current entries ("A")
    pub entries_a: Vec<Entry>,
    /// Comparison entries ("B")
    pub entries_b: Vec<Entry>,
    #[serde(default)]
    pub options: CompareOptions,
}

/// Input for synchronizing a target database from a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncInput {
    pub source: Database,
    pub target: Database,
    #[serde(default)]
    pub options: SyncOptions,
}

/// Synchronized target plus what changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutput {
    pub target: Database,
    pub report: SyncReport,
}

/// Input for merging a secondary database into a primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeInput {
    pub primary: Database,
    pub secondary: Database,
    #[serde(default)]
    pub options: MergeOptions,
}

/// Merged primary plus what was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutput {
    pub primary: Database,
    pub report: MergeReport,
}

fn validate_subgroup(subgroup: Option<&SubgroupFilter>) -> CoreResult<()> {
    if let Some(subgroup) = subgroup {
        subgroup.validate()?;
    }
    Ok(())
}

/// Compare a JSON string input and return JSON string output.
/// Convenience function for FFI.
pub fn compare_json(input_json: &str) -> CoreResult<String> {
    let input: CompareInput = serde_json::from_str(input_json)?;
    validate_subgroup(input.options.subgroup.as_ref())?;
    let report = compare(&input.entries_a, &input.entries_b, &input.options);
    Ok(serde_json::to_string(&report)?)
}

/// Synchronize a JSON string input and return JSON string output.
/// Convenience function for FFI.
pub fn synchronize_json(input_json: &str) -> CoreResult<String> {
    let input: SyncInput = serde_json::from_str(input_json)?;
    validate_subgroup(input.options.subgroup.as_ref())?;
    let SyncInput {
        source,
        mut target,
        options,
    } = input;
    let report = synchronize(&source, &mut target, &options);
    Ok(serde_json::to_string(&SyncOutput { target, report })?)
}

/// Merge a JSON string input and return JSON string output.
/// Convenience function for FFI.
pub fn merge_json(input_json: &str) -> CoreResult<String> {
    let input: MergeInput = serde_json::from_str(input_json)?;
    validate_subgroup(input.options.subgroup.as_ref())?;
    let MergeInput {
        mut primary,
        secondary,
        options,
    } = input;
    let report = merge(&mut primary, &secondary, &options)?;
    Ok(serde_json::to_string(&MergeOutput { primary, report })?)
}
