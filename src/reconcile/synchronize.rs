//! One-way synchronization of field values from a source database into a
//! target database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fields::{copy_field, field_equal};
use super::policy::{PolicyImporter, PolicyRenameMap};
use super::{admits, CancelFlag, GtuIndex, RunOutcome, SubgroupFilter};
use crate::entry::{Database, Entry, EntryStatus, GtuKey};
use crate::field_registry::{default_field_mask, FieldMask, FieldType, MaskContext};

fn default_fields() -> FieldMask {
    default_field_mask(MaskContext::Synchronize)
}

/// What to synchronize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Fields to copy; identity and derived fields are never copied
    #[serde(default = "default_fields")]
    pub fields: FieldMask,
    #[serde(default)]
    pub subgroup: Option<SubgroupFilter>,
    /// Timestamp used when a conflicting policy has to be renamed
    #[serde(default = "Utc::now")]
    pub now: DateTime<Utc>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            fields: default_fields(),
            subgroup: None,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Number of target entries changed
    pub modified_count: u32,
    pub policy_rename_map: PolicyRenameMap,
    /// Named policies copied into the target
    pub policies_added: Vec<String>,
    /// Keys of the changed entries, sorted
    pub updated: Vec<GtuKey>,
}

/// Copy the masked fields of every matching source entry into the target.
pub fn synchronize(source: &Database, target: &mut Database, options: &SyncOptions) -> SyncReport {
    run(source, target, options, None).into_inner()
}

/// Like [`synchronize`], polling `cancel` between entries.
///
/// Changes are staged; a cancelled run leaves the target untouched and
/// reports nothing modified.
pub fn synchronize_cancellable(
    source: &Database,
    target: &mut Database,
    options: &SyncOptions,
    cancel: &CancelFlag,
) -> RunOutcome<SyncReport> {
    run(source, target, options, Some(cancel))
}

fn run(
    source: &Database,
    target: &mut Database,
    options: &SyncOptions,
    cancel: Option<&CancelFlag>,
) -> RunOutcome<SyncReport> {
    let subgroup = options.subgroup.as_ref();
    let fields: Vec<FieldType> = options.fields.iter().filter(|f| f.is_copyable()).collect();
    debug!(
        source_entries = source.entries.len(),
        target_entries = target.entries.len(),
        fields = fields.len(),
        "synchronizing"
    );

    // Aliases and shortcuts hold no data of their own
    let eligible = |e: &Entry| !e.entry_type.is_dependent() && admits(subgroup, e);
    let mut index = GtuIndex::new(&target.entries, eligible);
    let mut importer = PolicyImporter::new(&source.policies, &target.policies, options.now);
    let mut staged: Vec<(usize, Entry)> = Vec::new();

    for entry in source.entries.iter().filter(|e| eligible(e)) {
        if cancel.map_or(false, CancelFlag::is_cancelled) {
            warn!(staged = staged.len(), "synchronize cancelled, target left unchanged");
            return RunOutcome::Cancelled(SyncReport::default());
        }
        let Some(i) = index.take(entry) else {
            continue;
        };
        let current = &target.entries[i];
        if current.protected {
            warn!(entry = %current.gtu(), "skipping protected entry");
            continue;
        }
        if current.uuid != entry.uuid {
            warn!(
                entry = %current.gtu(),
                source_uuid = %entry.uuid,
                target_uuid = %current.uuid,
                "matched entries have different UUIDs"
            );
        }

        let mut updated = current.clone();
        let mut changed = false;
        for &field in &fields {
            if field == FieldType::PolicyName {
                let name = importer.resolve(&entry.policy_name);
                if name != updated.policy_name {
                    updated.policy_name = name;
                    changed = true;
                }
            } else if !field_equal(entry, &updated, field, false) {
                copy_field(&mut updated, entry, field);
                changed = true;
            }
        }
        if changed {
            updated.status = EntryStatus::Modified;
            staged.push((i, updated));
        }
    }

    let (policies, policy_rename_map) = importer.finish();
    let mut report = SyncReport {
        modified_count: staged.len() as u32,
        policy_rename_map,
        ..Default::default()
    };
    for (i, entry) in staged {
        report.updated.push(entry.gtu());
        target.entries[i] = entry;
    }
    for (name, policy) in policies {
        report.policies_added.push(name.clone());
        target.policies.insert(name, policy);
    }
    report.updated.sort_by(GtuKey::sort_cmp);

    info!(
        modified = report.modified_count,
        policies_added = report.policies_added.len(),
        policies_renamed = report.policy_rename_map.len(),
        "synchronize finished"
    );
    RunOutcome::Completed(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryType, PasswordPolicy};
    use crate::filter::Rule;
    use crate::reconcile::SubgroupField;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn entry(group: &str, title: &str, password: &str) -> Entry {
        let mut e = Entry::new(group, title, "alice");
        e.password = password.to_string();
        e
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    fn options() -> SyncOptions {
        SyncOptions {
            now: fixed_now(),
            ..Default::default()
        }
    }

    #[test]
    fn test_copies_differing_fields() {
        let mut src = entry("Bank", "Visa", "new");
        src.notes = "pin 1234".to_string();
        src.url = "https://bank.example".to_string();
        let source = Database::new(vec![src, entry("Bank", "Amex", "x")]);

        let mut dst = entry("Bank", "Visa", "old");
        dst.url = "https://bank.example".to_string();
        let dst_uuid = dst.uuid;
        let mut target = Database::new(vec![dst]);

        let report = synchronize(&source, &mut target, &options());
        assert_eq!(report.modified_count, 1);
        assert_eq!(report.updated, vec![GtuKey::new("Bank", "Visa", "alice")]);

        let synced = &target.entries[0];
        assert_eq!(synced.password, "new");
        assert_eq!(synced.notes, "pin 1234");
        assert_eq!(synced.status, EntryStatus::Modified);
        assert_eq!(synced.uuid, dst_uuid);
        assert_eq!(target.entries.len(), 1);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut src = entry("g", "t", "new");
        src.policy_name = "web".to_string();
        let mut source = Database::new(vec![src]);
        source.policies.insert(
            "web".to_string(),
            PasswordPolicy {
                length: 20,
                ..Default::default()
            },
        );
        let mut target = Database::new(vec![entry("g", "t", "old")]);
        target.policies.insert(
            "web".to_string(),
            PasswordPolicy {
                length: 12,
                ..Default::default()
            },
        );

        let first = synchronize(&source, &mut target, &options());
        assert_eq!(first.modified_count, 1);
        assert_eq!(first.policy_rename_map["web"], "web-merged-20240102-030405");
        assert_eq!(target.entries[0].policy_name, "web-merged-20240102-030405");

        let later = SyncOptions {
            now: fixed_now() + chrono::Duration::hours(1),
            ..Default::default()
        };
        let second = synchronize(&source, &mut target, &later);
        assert_eq!(second.modified_count, 0);
        assert!(second.policies_added.is_empty());
        assert_eq!(target.policies.len(), 2);
    }

    #[test]
    fn test_protected_and_dependent_entries_are_skipped() {
        let source = Database::new(vec![entry("g", "locked", "new"), entry("g", "alias", "new")]);
        let mut locked = entry("g", "locked", "old");
        locked.protected = true;
        let mut alias = entry("g", "alias", "old");
        alias.entry_type = EntryType::Alias;
        let mut target = Database::new(vec![locked, alias]);
        let before = target.clone();

        let report = synchronize(&source, &mut target, &options());
        assert_eq!(report.modified_count, 0);
        assert_eq!(target, before);
    }

    #[test]
    fn test_identity_never_copied_and_mask_respected() {
        let mut src = entry("g", "t", "new");
        src.notes = "n".to_string();
        let source = Database::new(vec![src]);
        let mut target = Database::new(vec![entry("g", "t", "old")]);

        let options = SyncOptions {
            fields: [FieldType::Notes, FieldType::Title].into_iter().collect(),
            ..options()
        };
        synchronize(&source, &mut target, &options);
        assert_eq!(target.entries[0].notes, "n");
        assert_eq!(target.entries[0].password, "old");
    }

    #[test]
    fn test_subgroup_restricts_sync() {
        let source = Database::new(vec![
            entry("Bank", "Visa", "new"),
            entry("Mail", "Home", "new"),
        ]);
        let mut target = Database::new(vec![
            entry("Bank", "Visa", "old"),
            entry("Mail", "Home", "old"),
        ]);
        let options = SyncOptions {
            subgroup: Some(SubgroupFilter::new(SubgroupField::Group, Rule::Equals, "Bank")),
            ..options()
        };
        let report = synchronize(&source, &mut target, &options);
        assert_eq!(report.modified_count, 1);
        assert_eq!(target.entries[0].password, "new");
        assert_eq!(target.entries[1].password, "old");
    }

    #[test]
    fn test_missing_policy_copied_and_unknown_name_cleared() {
        let mut with_policy = entry("g", "a", "x");
        with_policy.policy_name = "pin".to_string();
        let mut dangling = entry("g", "b", "x");
        dangling.policy_name = "gone".to_string();
        let mut source = Database::new(vec![with_policy, dangling]);
        source.policies = BTreeMap::from([(
            "pin".to_string(),
            PasswordPolicy {
                length: 4,
                use_digits: true,
                ..Default::default()
            },
        )]);

        let mut stale = entry("g", "b", "x");
        stale.policy_name = "old".to_string();
        let mut target = Database::new(vec![entry("g", "a", "x"), stale]);

        let report = synchronize(&source, &mut target, &options());
        assert_eq!(report.policies_added, vec!["pin".to_string()]);
        assert!(target.policies.contains_key("pin"));
        assert_eq!(target.entries[0].policy_name, "pin");
        assert_eq!(target.entries[1].policy_name, "");
    }

    #[test]
    fn test_cancelled_sync_commits_nothing() {
        let source = Database::new(vec![entry("g", "t", "new")]);
        let mut target = Database::new(vec![entry("g", "t", "old")]);
        let before = target.clone();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = synchronize_cancellable(&source, &mut target, &options(), &cancel);
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.into_inner().modified_count, 0);
        assert_eq!(target, before);
    }
}
