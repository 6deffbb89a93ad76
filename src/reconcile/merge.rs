//! Additive merge of a secondary database into a primary database.
//!
//! Entries whose group/title/user key is new to the primary are added;
//! everything else is left as it is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::policy::{PolicyImporter, PolicyRenameMap};
use super::{admits, SubgroupFilter};
use crate::entry::{Database, Entry, EntryStatus, EntryType, GtuKey};
use crate::error::{CoreResult, PreconditionError};
use crate::filter::FilterPool;

/// Merge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Also copy saved filters stored in the secondary database
    #[serde(default)]
    pub copy_db_filters: bool,
    #[serde(default)]
    pub subgroup: Option<SubgroupFilter>,
    /// Timestamp used when a conflicting policy has to be renamed
    #[serde(default = "Utc::now")]
    pub now: DateTime<Utc>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            copy_db_filters: false,
            subgroup: None,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub added_count: u32,
    /// Primary-side UUIDs of the added entries, in insertion order
    pub added_uuids: Vec<Uuid>,
    /// Secondary entries whose key already exists in the primary
    pub skipped_count: u32,
    /// Aliases and shortcuts whose base could not be found
    pub dependents_skipped: u32,
    pub filters_added: Vec<String>,
    pub policy_rename_map: PolicyRenameMap,
    pub policies_added: Vec<String>,
    /// Keys of the added entries, sorted
    pub added: Vec<GtuKey>,
}

impl MergeReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Merge added {} entries; {} skipped as already present",
            self.added_count, self.skipped_count
        );
        if self.dependents_skipped > 0 {
            summary.push_str(&format!(
                "; {} aliases or shortcuts without a base",
                self.dependents_skipped
            ));
        }
        if !self.policies_added.is_empty() {
            summary.push_str(&format!("; {} policies added", self.policies_added.len()));
        }
        if !self.filters_added.is_empty() {
            summary.push_str(&format!("; {} filters copied", self.filters_added.len()));
        }
        summary
    }

    /// One line per added entry, then one per renamed policy.
    pub fn report_lines(&self) -> Vec<String> {
        let entries = self.added.iter().map(|key| format!("Added {}", key));
        let renames = self
            .policy_rename_map
            .iter()
            .map(|(old, new)| format!("Policy \u{ab}{}\u{bb} renamed to \u{ab}{}\u{bb}", old, new));
        entries.chain(renames).collect()
    }
}

fn check_unique(database: &'static str, db: &Database) -> Result<(), PreconditionError> {
    match db.find_duplicate_gtu() {
        Some(key) => {
            warn!(database, entry = %key, "duplicate group/title/user, merge refused");
            Err(PreconditionError::DuplicateGtu {
                database,
                group: key.group,
                title: key.title,
                user: key.user,
            })
        }
        None => Ok(()),
    }
}

fn fresh_uuid(taken: &mut HashSet<Uuid>) -> Uuid {
    loop {
        let uuid = Uuid::new_v4();
        if taken.insert(uuid) {
            return uuid;
        }
    }
}

/// Add every entry of `secondary` whose key the primary lacks.
///
/// Both databases must have unique group/title/user keys; otherwise nothing
/// is modified.
pub fn merge(
    primary: &mut Database,
    secondary: &Database,
    options: &MergeOptions,
) -> CoreResult<MergeReport> {
    check_unique("primary", primary)?;
    check_unique("secondary", secondary)?;

    let subgroup = options.subgroup.as_ref();
    debug!(
        primary_entries = primary.entries.len(),
        secondary_entries = secondary.entries.len(),
        copy_db_filters = options.copy_db_filters,
        "merging"
    );

    let mut known_keys: HashSet<GtuKey> = primary.entries.iter().map(Entry::gtu).collect();
    let mut taken_uuids: HashSet<Uuid> = primary.entries.iter().map(|e| e.uuid).collect();
    let mut remap: HashMap<Uuid, Uuid> = HashMap::new();
    let mut importer = PolicyImporter::new(&secondary.policies, &primary.policies, options.now);
    let mut additions: Vec<Entry> = Vec::new();
    let mut base_marks: Vec<(Uuid, EntryType)> = Vec::new();
    let mut report = MergeReport::default();

    // Bases go first so dependents can be pointed at them
    let (independent, dependents): (Vec<&Entry>, Vec<&Entry>) = secondary
        .entries
        .iter()
        .filter(|e| admits(subgroup, e))
        .partition(|e| !e.entry_type.is_dependent());

    for entry in independent {
        if !known_keys.insert(entry.gtu()) {
            report.skipped_count += 1;
            continue;
        }
        let mut added = entry.clone();
        if !taken_uuids.insert(added.uuid) {
            added.uuid = fresh_uuid(&mut taken_uuids);
        }
        remap.insert(entry.uuid, added.uuid);
        added.policy_name = importer.resolve(&entry.policy_name);
        added.status = EntryStatus::Added;
        // Marked again below if any of its dependents is merged too
        if added.entry_type.is_base() {
            added.entry_type = EntryType::Normal;
        }
        additions.push(added);
    }

    for entry in dependents {
        if known_keys.contains(&entry.gtu()) {
            report.skipped_count += 1;
            continue;
        }
        // The base as it exists in the primary: just added, or already there
        let base = entry.base_uuid.and_then(|uuid| {
            remap.get(&uuid).copied().or_else(|| {
                secondary
                    .find_by_uuid(&uuid)
                    .and_then(|b| primary.find_by_gtu(&b.gtu()))
                    .filter(|b| !b.entry_type.is_dependent())
                    .map(|b| b.uuid)
            })
        });
        let Some(base) = base else {
            warn!(entry = %entry.gtu(), "alias or shortcut has no base, skipped");
            report.dependents_skipped += 1;
            continue;
        };
        known_keys.insert(entry.gtu());
        let mut added = entry.clone();
        if !taken_uuids.insert(added.uuid) {
            added.uuid = fresh_uuid(&mut taken_uuids);
        }
        added.base_uuid = Some(base);
        added.policy_name = importer.resolve(&entry.policy_name);
        added.status = EntryStatus::Added;
        let mark = match entry.entry_type {
            EntryType::Shortcut => EntryType::ShortcutBase,
            _ => EntryType::AliasBase,
        };
        base_marks.push((base, mark));
        additions.push(added);
    }

    let (policies, policy_rename_map) = importer.finish();
    report.policy_rename_map = policy_rename_map;
    report.added_count = additions.len() as u32;
    report.added_uuids = additions.iter().map(|e| e.uuid).collect();
    report.added = additions.iter().map(Entry::gtu).collect();
    report.added.sort_by(GtuKey::sort_cmp);

    primary.entries.extend(additions);
    for (uuid, mark) in base_marks {
        if let Some(base) = primary.entries.iter_mut().find(|e| e.uuid == uuid) {
            if base.entry_type == EntryType::Normal {
                base.entry_type = mark;
            }
        }
    }
    for (name, policy) in policies {
        report.policies_added.push(name.clone());
        primary.policies.insert(name, policy);
    }

    if options.copy_db_filters {
        for filter in secondary.filters.iter().filter(|f| f.pool == FilterPool::Database) {
            let exists = primary
                .filters
                .iter()
                .any(|f| f.pool == FilterPool::Database && f.name == filter.name);
            if !exists {
                report.filters_added.push(filter.name.clone());
                primary.filters.push(filter.clone());
            }
        }
    }

    info!(
        added = report.added_count,
        skipped = report.skipped_count,
        dependents_skipped = report.dependents_skipped,
        filters_added = report.filters_added.len(),
        "merge finished"
    );
    Ok(report)
}
