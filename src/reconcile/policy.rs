//! Import of named password policies from one database into another.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::entry::PasswordPolicy;

/// Policy names that had to be renamed on import, old name to new name.
pub type PolicyRenameMap = BTreeMap<String, String>;

/// Resolves the policy names of incoming entries against a target database.
///
/// Works on a snapshot of the target policies; nothing is written until the
/// caller commits the result of [`PolicyImporter::finish`].
pub(crate) struct PolicyImporter<'s> {
    source: &'s BTreeMap<String, PasswordPolicy>,
    target: BTreeMap<String, PasswordPolicy>,
    added: Vec<(String, PasswordPolicy)>,
    renames: PolicyRenameMap,
    stamp: String,
}

impl<'s> PolicyImporter<'s> {
    pub(crate) fn new(
        source: &'s BTreeMap<String, PasswordPolicy>,
        target: &BTreeMap<String, PasswordPolicy>,
        now: DateTime<Utc>,
    ) -> Self {
        PolicyImporter {
            source,
            target: target.clone(),
            added: Vec::new(),
            renames: PolicyRenameMap::new(),
            stamp: now.format("%Y%m%d-%H%M%S").to_string(),
        }
    }

    /// Name the incoming entry should carry in the target.
    ///
    /// A name with no definition in the source resolves to the empty name.
    pub(crate) fn resolve(&mut self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        if let Some(renamed) = self.renames.get(name) {
            return renamed.clone();
        }
        let source = self.source;
        let Some(policy) = source.get(name) else {
            debug!(policy = name, "policy name has no definition in source");
            return String::new();
        };

        match self.target.get(name) {
            Some(existing) if existing == policy => name.to_string(),
            None => {
                self.add(name.to_string(), policy);
                name.to_string()
            }
            Some(_) => {
                let equal = self
                    .target
                    .iter()
                    .find(|(_, p)| *p == policy)
                    .map(|(n, _)| n.clone());
                let new_name = match equal {
                    Some(existing) => existing,
                    None => {
                        let unique = self.unique_name(name);
                        self.add(unique.clone(), policy);
                        unique
                    }
                };
                debug!(policy = name, renamed = %new_name, "policy definitions differ");
                self.renames.insert(name.to_string(), new_name.clone());
                new_name
            }
        }
    }

    fn add(&mut self, name: String, policy: &PasswordPolicy) {
        self.target.insert(name.clone(), policy.clone());
        self.added.push((name, policy.clone()));
    }

    fn unique_name(&self, name: &str) -> String {
        let base = format!("{}-merged-{}", name, self.stamp);
        if !self.target.contains_key(&base) {
            return base;
        }
        (2u32..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !self.target.contains_key(candidate))
            .unwrap_or(base)
    }

    /// Policies to add to the target, in resolution order, and the renames made.
    pub(crate) fn finish(self) -> (Vec<(String, PasswordPolicy)>, PolicyRenameMap) {
        (self.added, self.renames)
    }
}
