//! Field-by-field comparison of two entry collections.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::fields::field_equal;
use super::{admits, CancelFlag, GtuIndex, RunOutcome, SubgroupFilter};
use crate::entry::{data_source, index_by_uuid, Entry, GtuKey};
use crate::field_registry::{default_field_mask, FieldMask, FieldType, MaskContext};

fn default_fields() -> FieldMask {
    default_field_mask(MaskContext::Compare)
}

fn default_true() -> bool {
    true
}

/// What to compare and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Fields to diff; fields that are not comparable are ignored
    #[serde(default = "default_fields")]
    pub fields: FieldMask,
    #[serde(default)]
    pub subgroup: Option<SubgroupFilter>,
    /// Treat whitespace-only notes, URL and autotype as empty
    #[serde(default = "default_true")]
    pub whitespace_as_empty: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions {
            fields: default_fields(),
            subgroup: None,
            whitespace_as_empty: true,
        }
    }
}

/// Outcome for one entry (or matched pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareBucket {
    OnlyInA,
    OnlyInB,
    Conflict,
    Identical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRecord {
    pub bucket: CompareBucket,
    pub group: String,
    pub title: String,
    pub user: String,
    pub uuid_a: Option<Uuid>,
    pub uuid_b: Option<Uuid>,
    /// Fields whose values differ; empty unless the bucket is `Conflict`
    pub diffs: FieldMask,
    pub unknown_fields_a: bool,
    pub unknown_fields_b: bool,
}

impl CompareRecord {
    fn only_in_a(entry: &Entry) -> Self {
        CompareRecord {
            bucket: CompareBucket::OnlyInA,
            group: entry.group.clone(),
            title: entry.title.clone(),
            user: entry.user.clone(),
            uuid_a: Some(entry.uuid),
            uuid_b: None,
            diffs: FieldMask::empty(),
            unknown_fields_a: entry.has_unknown_fields(),
            unknown_fields_b: false,
        }
    }

    fn only_in_b(entry: &Entry) -> Self {
        CompareRecord {
            bucket: CompareBucket::OnlyInB,
            uuid_a: None,
            uuid_b: Some(entry.uuid),
            unknown_fields_a: false,
            unknown_fields_b: entry.has_unknown_fields(),
            ..CompareRecord::only_in_a(entry)
        }
    }

    fn matched(a: &Entry, b: &Entry, diffs: FieldMask) -> Self {
        let bucket = if diffs.is_empty() {
            CompareBucket::Identical
        } else {
            CompareBucket::Conflict
        };
        CompareRecord {
            bucket,
            uuid_b: Some(b.uuid),
            diffs,
            unknown_fields_b: b.has_unknown_fields(),
            ..CompareRecord::only_in_a(a)
        }
    }

    pub fn gtu(&self) -> GtuKey {
        GtuKey::new(&self.group, &self.title, &self.user)
    }

    fn sort_cmp(&self, other: &CompareRecord) -> Ordering {
        self.gtu()
            .sort_cmp(&other.gtu())
            .then_with(|| self.uuid_a.or(self.uuid_b).cmp(&other.uuid_a.or(other.uuid_b)))
    }
}

/// Compare results, one list per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareReport {
    pub only_in_a: Vec<CompareRecord>,
    pub only_in_b: Vec<CompareRecord>,
    pub conflicts: Vec<CompareRecord>,
    pub identical: Vec<CompareRecord>,
}

impl CompareReport {
    pub fn total(&self) -> usize {
        self.only_in_a.len() + self.only_in_b.len() + self.conflicts.len() + self.identical.len()
    }

    /// Every record: conflicts, then only-in-A, only-in-B and identical.
    pub fn records(&self) -> impl Iterator<Item = &CompareRecord> {
        self.conflicts
            .iter()
            .chain(&self.only_in_a)
            .chain(&self.only_in_b)
            .chain(&self.identical)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} conflicting, {} only in current, {} only in comparison, {} identical",
            self.conflicts.len(),
            self.only_in_a.len(),
            self.only_in_b.len(),
            self.identical.len()
        )
    }

    fn sort(&mut self) {
        for bucket in [
            &mut self.only_in_a,
            &mut self.only_in_b,
            &mut self.conflicts,
            &mut self.identical,
        ] {
            bucket.sort_by(CompareRecord::sort_cmp);
        }
    }
}

/// Compare the current entries `a` with the comparison entries `b`.
pub fn compare(a: &[Entry], b: &[Entry], options: &CompareOptions) -> CompareReport {
    run(a, b, options, None).into_inner()
}

/// Like [`compare`], polling `cancel` between entries.
///
/// A cancelled run reports the entries of `a` handled so far and no
/// only-in-B records.
pub fn compare_cancellable(
    a: &[Entry],
    b: &[Entry],
    options: &CompareOptions,
    cancel: &CancelFlag,
) -> RunOutcome<CompareReport> {
    run(a, b, options, Some(cancel))
}

fn run(
    a: &[Entry],
    b: &[Entry],
    options: &CompareOptions,
    cancel: Option<&CancelFlag>,
) -> RunOutcome<CompareReport> {
    let subgroup = options.subgroup.as_ref();
    let fields: Vec<FieldType> = options.fields.iter().filter(|f| f.is_comparable()).collect();
    debug!(
        entries_a = a.len(),
        entries_b = b.len(),
        fields = fields.len(),
        subgroup = subgroup.is_some(),
        "comparing entries"
    );

    let bases_a = index_by_uuid(a);
    let bases_b = index_by_uuid(b);
    let mut index = GtuIndex::new(b, |e| admits(subgroup, e));
    let mut report = CompareReport::default();

    for entry in a.iter().filter(|e| admits(subgroup, e)) {
        if cancel.map_or(false, CancelFlag::is_cancelled) {
            warn!(handled = report.total(), "compare cancelled");
            report.sort();
            return RunOutcome::Cancelled(report);
        }
        let Some(i) = index.take(entry) else {
            report.only_in_a.push(CompareRecord::only_in_a(entry));
            continue;
        };
        let other = &b[i];
        let diffs: FieldMask = fields
            .iter()
            .copied()
            .filter(|&field| {
                !field_equal(
                    data_source(entry, field, &bases_a),
                    data_source(other, field, &bases_b),
                    field,
                    options.whitespace_as_empty,
                )
            })
            .collect();
        let record = CompareRecord::matched(entry, other, diffs);
        match record.bucket {
            CompareBucket::Conflict => report.conflicts.push(record),
            _ => report.identical.push(record),
        }
    }

    for i in index.remaining() {
        report.only_in_b.push(CompareRecord::only_in_b(&b[i]));
    }
    report.sort();

    info!(
        conflicts = report.conflicts.len(),
        only_in_a = report.only_in_a.len(),
        only_in_b = report.only_in_b.len(),
        identical = report.identical.len(),
        "compare finished"
    );
    RunOutcome::Completed(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryType;
    use crate::filter::Rule;
    use crate::reconcile::SubgroupField;
    use std::collections::HashSet;

    fn entry(group: &str, title: &str, user: &str, password: &str) -> Entry {
        let mut e = Entry::new(group, title, user);
        e.password = password.to_string();
        e
    }

    fn mask(fields: &[FieldType]) -> FieldMask {
        fields.iter().copied().collect()
    }

    #[test]
    fn test_whitespace_notes_are_not_a_conflict() {
        let mut a = entry("Bank", "Visa", "alice", "p1");
        a.notes = String::new();
        let mut b = entry("Bank", "Visa", "alice", "p2");
        b.notes = " ".to_string();

        let options = CompareOptions {
            fields: mask(&[FieldType::Password, FieldType::Notes]),
            ..Default::default()
        };
        let report = compare(&[a], &[b], &options);

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].diffs, mask(&[FieldType::Password]));
        assert_eq!(report.total(), 1);
    }

    #[test]
    fn test_whitespace_password_is_a_conflict() {
        let a = entry("Bank", "Visa", "alice", "");
        let b = entry("Bank", "Visa", "alice", " ");

        let options = CompareOptions {
            fields: mask(&[FieldType::Password]),
            whitespace_as_empty: true,
            ..Default::default()
        };
        let report = compare(&[a], &[b], &options);

        assert!(report.identical.is_empty());
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].diffs, mask(&[FieldType::Password]));
    }

    #[test]
    fn test_buckets_partition_both_sides() {
        let a = vec![
            entry("g", "same", "u", "x"),
            entry("g", "changed", "u", "x"),
            entry("g", "only-a", "u", "x"),
        ];
        let b = vec![
            entry("g", "only-b", "u", "x"),
            entry("g", "changed", "u", "y"),
            entry("g", "same", "u", "x"),
        ];
        let report = compare(&a, &b, &CompareOptions::default());

        assert_eq!(report.identical.len(), 1);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.only_in_a.len(), 1);
        assert_eq!(report.only_in_b.len(), 1);

        let mut seen_a = HashSet::new();
        let mut seen_b = HashSet::new();
        for record in report.records() {
            if let Some(uuid) = record.uuid_a {
                assert!(seen_a.insert(uuid));
            }
            if let Some(uuid) = record.uuid_b {
                assert!(seen_b.insert(uuid));
            }
        }
        assert_eq!(seen_a, a.iter().map(|e| e.uuid).collect::<HashSet<_>>());
        assert_eq!(seen_b, b.iter().map(|e| e.uuid).collect::<HashSet<_>>());
    }

    #[test]
    fn test_time_fields_only_when_masked() {
        let mut a = entry("g", "t", "u", "x");
        let b = entry("g", "t", "u", "x");
        a.created = Some(chrono::Utc::now());

        let report = compare(&[a.clone()], &[b.clone()], &CompareOptions::default());
        assert_eq!(report.identical.len(), 1);

        let options = CompareOptions {
            fields: default_field_mask(MaskContext::Compare).with(FieldType::Created),
            ..Default::default()
        };
        let report = compare(&[a], &[b], &options);
        assert_eq!(report.conflicts[0].diffs, mask(&[FieldType::Created]));
    }

    #[test]
    fn test_duplicate_gtu_prefers_same_uuid() {
        let a = entry("g", "t", "u", "x");
        let mut twin = entry("g", "t", "u", "y");
        let mut same = entry("g", "t", "u", "x");
        same.uuid = a.uuid;
        twin.notes = "twin".to_string();

        let report = compare(&[a.clone()], &[twin.clone(), same], &CompareOptions::default());
        assert_eq!(report.identical.len(), 1);
        assert_eq!(report.identical[0].uuid_b, Some(a.uuid));
        assert_eq!(report.only_in_b.len(), 1);
        assert_eq!(report.only_in_b[0].uuid_b, Some(twin.uuid));
    }

    #[test]
    fn test_alias_password_comes_from_base() {
        let base_a = entry("g", "base", "u", "secret");
        let mut alias_a = entry("g", "alias", "u", "");
        alias_a.entry_type = EntryType::Alias;
        alias_a.base_uuid = Some(base_a.uuid);

        let mut alias_b = entry("g", "alias", "u", "secret");
        alias_b.uuid = alias_a.uuid;

        let options = CompareOptions {
            fields: mask(&[FieldType::Password]),
            ..Default::default()
        };
        let report = compare(&[base_a, alias_a], &[alias_b], &options);
        assert_eq!(report.identical.len(), 1);
        assert_eq!(report.identical[0].title, "alias");
        assert_eq!(report.only_in_a.len(), 1);
    }

    #[test]
    fn test_subgroup_limits_both_sides() {
        let a = vec![entry("Bank", "Visa", "u", "x"), entry("Mail", "Home", "u", "x")];
        let b = vec![entry("Bank", "Amex", "u", "x"), entry("Mail", "Work", "u", "x")];
        let options = CompareOptions {
            subgroup: Some(SubgroupFilter::new(SubgroupField::Group, Rule::Equals, "bank")),
            ..Default::default()
        };
        let report = compare(&a, &b, &options);
        assert_eq!(report.only_in_a.len(), 1);
        assert_eq!(report.only_in_a[0].title, "Visa");
        assert_eq!(report.only_in_b.len(), 1);
        assert_eq!(report.only_in_b[0].title, "Amex");
    }

    #[test]
    fn test_buckets_sorted_case_insensitively() {
        let a = vec![
            entry("b", "t", "u", "x"),
            entry("C", "t", "u", "x"),
            entry("A", "t", "u", "x"),
        ];
        let report = compare(&a, &[], &CompareOptions::default());
        let groups: Vec<&str> = report.only_in_a.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["A", "b", "C"]);
    }

    #[test]
    fn test_cancelled_compare_returns_partial_report() {
        let a = vec![entry("g", "t", "u", "x")];
        let b = vec![entry("g", "other", "u", "x")];
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = compare_cancellable(&a, &b, &CompareOptions::default(), &cancel);
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.into_inner().total(), 0);

        let outcome = compare_cancellable(&a, &b, &CompareOptions::default(), &CancelFlag::new());
        assert!(!outcome.is_cancelled());
        assert_eq!(outcome.into_inner().total(), 2);
    }

    #[test]
    fn test_unknown_fields_are_flagged() {
        let mut a = entry("g", "t", "u", "x");
        a.unknown_field_count = 2;
        let b = entry("g", "t", "u", "x");
        let report = compare(&[a], &[b], &CompareOptions::default());
        assert!(report.identical[0].unknown_fields_a);
        assert!(!report.identical[0].unknown_fields_b);
    }
}
