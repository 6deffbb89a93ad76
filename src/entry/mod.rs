//! Entry and database model shared by the filter and reconcile modules.
//!
//! Entries arrive already decrypted; nothing here touches storage. An entry is
//! identified by its group/title/user triple ([`GtuKey`]) and additionally
//! carries a stable [`Uuid`].

mod policy;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::field_registry::FieldType;
use crate::filter::StoredFilter;

pub use policy::PasswordPolicy;

/// Kind of entry with respect to alias/shortcut dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[default]
    Normal,
    /// Uses the password of its base entry
    Alias,
    /// Uses every field except group/title/user of its base entry
    Shortcut,
    AliasBase,
    ShortcutBase,
}

impl EntryType {
    /// Aliases and shortcuts depend on a base entry.
    pub fn is_dependent(self) -> bool {
        matches!(self, EntryType::Alias | EntryType::Shortcut)
    }

    pub fn is_base(self) -> bool {
        matches!(self, EntryType::AliasBase | EntryType::ShortcutBase)
    }
}

/// Unsaved-change status of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    Clean,
    Added,
    Modified,
}

/// Double-click action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dca {
    Autotype,
    CopyPassword,
    Browse,
    CopyNotes,
    CopyUsername,
    CopyPasswordMinimize,
    BrowsePlus,
    ViewEdit,
    RunCommand,
    SendEmail,
}

impl fmt::Display for Dca {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dca::Autotype => "autotype",
            Dca::CopyPassword => "copy password",
            Dca::Browse => "browse",
            Dca::CopyNotes => "copy notes",
            Dca::CopyUsername => "copy username",
            Dca::CopyPasswordMinimize => "copy password and minimize",
            Dca::BrowsePlus => "browse and autotype",
            Dca::ViewEdit => "view/edit",
            Dca::RunCommand => "run command",
            Dca::SendEmail => "send email",
        };
        f.write_str(s)
    }
}

/// One previous password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub changed_at: DateTime<Utc>,
    pub password: String,
}

/// Password history of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHistory {
    /// Whether new passwords are recorded
    #[serde(default)]
    pub active: bool,
    /// Maximum number of items kept
    #[serde(default)]
    pub max_size: u32,
    /// Oldest first
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

impl PasswordHistory {
    /// A history counts as present once it was ever configured or used.
    pub fn is_present(&self) -> bool {
        self.max_size > 0 || !self.items.is_empty()
    }
}

/// File attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_accessed: Option<DateTime<Utc>>,
}

/// Group/title/user identity of an entry.
///
/// Equality and hashing are exact; [`GtuKey::sort_cmp`] gives the
/// case-insensitive ordering used for reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GtuKey {
    pub group: String,
    pub title: String,
    pub user: String,
}

impl GtuKey {
    pub fn new(group: &str, title: &str, user: &str) -> Self {
        GtuKey {
            group: group.to_string(),
            title: title.to_string(),
            user: user.to_string(),
        }
    }

    /// Case-insensitive by group, title, user; exact comparison breaks ties.
    pub fn sort_cmp(&self, other: &GtuKey) -> Ordering {
        let folded = |k: &GtuKey| {
            (
                k.group.to_lowercase(),
                k.title.to_lowercase(),
                k.user.to_lowercase(),
            )
        };
        folded(self)
            .cmp(&folded(other))
            .then_with(|| self.group.cmp(&other.group))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.user.cmp(&other.user))
    }
}

impl fmt::Display for GtuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\u{ab}{}\u{bb} \u{ab}{}\u{bb} \u{ab}{}\u{bb}",
            self.group, self.title, self.user
        )
    }
}

/// A decrypted password entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub uuid: Uuid,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub autotype: String,
    #[serde(default)]
    pub email: String,
    /// Allowed symbols for generated passwords
    #[serde(default)]
    pub symbols: String,
    /// Name of a database-level password policy
    #[serde(default)]
    pub policy_name: String,
    #[serde(default)]
    pub run_command: String,
    #[serde(default)]
    pub kb_shortcut: String,
    /// `None` means "use the configured default"
    #[serde(default)]
    pub dca: Option<Dca>,
    #[serde(default)]
    pub shift_dca: Option<Dca>,
    #[serde(default)]
    pub protected: bool,
    /// Number of fields the format did not recognise
    #[serde(default)]
    pub unknown_field_count: u32,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
    /// Absolute password expiry
    #[serde(default)]
    pub password_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub record_modified: Option<DateTime<Utc>>,
    /// Recurring expiry in days
    #[serde(default)]
    pub expiry_interval: Option<u32>,
    #[serde(default)]
    pub history: PasswordHistory,
    /// Entry-specific policy
    #[serde(default)]
    pub policy: Option<PasswordPolicy>,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default)]
    pub status: EntryStatus,
    /// Base entry of an alias or shortcut
    #[serde(default)]
    pub base_uuid: Option<Uuid>,
}

impl Entry {
    /// Create a normal, clean entry with a fresh UUID and no other data.
    pub fn new(group: &str, title: &str, user: &str) -> Self {
        Entry {
            uuid: Uuid::new_v4(),
            group: group.to_string(),
            title: title.to_string(),
            user: user.to_string(),
            password: String::new(),
            notes: String::new(),
            url: String::new(),
            autotype: String::new(),
            email: String::new(),
            symbols: String::new(),
            policy_name: String::new(),
            run_command: String::new(),
            kb_shortcut: String::new(),
            dca: None,
            shift_dca: None,
            protected: false,
            unknown_field_count: 0,
            created: None,
            password_modified: None,
            last_accessed: None,
            password_expiry: None,
            record_modified: None,
            expiry_interval: None,
            history: PasswordHistory::default(),
            policy: None,
            attachment: None,
            entry_type: EntryType::Normal,
            status: EntryStatus::Clean,
            base_uuid: None,
        }
    }

    pub fn gtu(&self) -> GtuKey {
        GtuKey::new(&self.group, &self.title, &self.user)
    }

    /// `group.title`, the value of the group-title field.
    pub fn group_title(&self) -> String {
        format!("{}.{}", self.group, self.title)
    }

    pub fn has_unknown_fields(&self) -> bool {
        self.unknown_field_count > 0
    }

    /// Password length in characters.
    pub fn password_len(&self) -> usize {
        self.password.chars().count()
    }

    /// Approximate storage size in bytes: every text field plus history passwords.
    pub fn size(&self) -> u64 {
        let text: usize = [
            &self.group,
            &self.title,
            &self.user,
            &self.password,
            &self.notes,
            &self.url,
            &self.autotype,
            &self.email,
            &self.symbols,
            &self.policy_name,
            &self.run_command,
            &self.kb_shortcut,
        ]
        .iter()
        .map(|s| s.len())
        .sum();
        let history: usize = self.history.items.iter().map(|h| h.password.len()).sum();
        (text + history) as u64
    }

    /// When the password expires.
    ///
    /// The absolute expiry wins; otherwise the interval is counted from the
    /// last password change (or creation).
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        if let Some(at) = self.password_expiry {
            return Some(at);
        }
        let days = self.expiry_interval.filter(|d| *d > 0)?;
        let start = self.password_modified.or(self.created)?;
        start.checked_add_signed(Duration::try_days(i64::from(days))?)
    }
}

/// Everything the core needs from one database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub entries: Vec<Entry>,
    /// Named password policies
    #[serde(default)]
    pub policies: BTreeMap<String, PasswordPolicy>,
    /// Saved filters stored with the database
    #[serde(default)]
    pub filters: Vec<StoredFilter>,
}

impl Database {
    pub fn new(entries: Vec<Entry>) -> Self {
        Database {
            entries,
            ..Default::default()
        }
    }

    pub fn find_by_uuid(&self, uuid: &Uuid) -> Option<&Entry> {
        self.entries.iter().find(|e| &e.uuid == uuid)
    }

    pub fn find_by_gtu(&self, key: &GtuKey) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.group == key.group && e.title == key.title && e.user == key.user)
    }

    /// First group/title/user key that occurs more than once, if any.
    pub fn find_duplicate_gtu(&self) -> Option<GtuKey> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(Entry::gtu)
            .find(|key| !seen.insert(key.clone()))
    }
}

/// UUID -> entry lookup used to resolve alias and shortcut bases.
pub(crate) fn index_by_uuid(entries: &[Entry]) -> HashMap<Uuid, &Entry> {
    entries.iter().map(|e| (e.uuid, e)).collect()
}

/// Entry whose data answers for `field`.
///
/// An alias reads its password from the base; a shortcut reads everything
/// except identity, entry type and status from the base. A missing base
/// leaves the entry answering for itself.
pub(crate) fn data_source<'e>(
    entry: &'e Entry,
    field: FieldType,
    bases: &HashMap<Uuid, &'e Entry>,
) -> &'e Entry {
    let follows_base = match entry.entry_type {
        EntryType::Alias => field == FieldType::Password,
        EntryType::Shortcut => {
            !(field.is_identity() || matches!(field, FieldType::EntryType | FieldType::EntryStatus))
        }
        _ => false,
    };
    if !follows_base {
        return entry;
    }
    entry
        .base_uuid
        .and_then(|uuid| bases.get(&uuid).copied())
        .unwrap_or(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_expiry_prefers_absolute_time() {
        let mut entry = Entry::new("g", "t", "u");
        entry.password_expiry = Some(ts(2024, 3, 1));
        entry.expiry_interval = Some(10);
        entry.password_modified = Some(ts(2024, 1, 1));
        assert_eq!(entry.expiry(), Some(ts(2024, 3, 1)));
    }

    #[test]
    fn test_expiry_from_interval() {
        let mut entry = Entry::new("g", "t", "u");
        entry.expiry_interval = Some(10);
        entry.created = Some(ts(2024, 1, 1));
        assert_eq!(entry.expiry(), Some(ts(2024, 1, 11)));

        entry.password_modified = Some(ts(2024, 2, 1));
        assert_eq!(entry.expiry(), Some(ts(2024, 2, 11)));

        entry.expiry_interval = Some(0);
        assert_eq!(entry.expiry(), None);
    }

    #[test]
    fn test_size_and_password_len() {
        let mut entry = Entry::new("ab", "c", "");
        entry.password = "pässword".to_string();
        assert_eq!(entry.password_len(), 8);
        // "ä" is two bytes
        assert_eq!(entry.size(), 2 + 1 + 9);
    }

    #[test]
    fn test_gtu_sort_is_case_insensitive() {
        let a = GtuKey::new("bank", "Visa", "alice");
        let b = GtuKey::new("Bank", "visa", "bob");
        let c = GtuKey::new("Bank", "Visa", "alice");
        assert_eq!(a.sort_cmp(&b), Ordering::Less);
        assert_ne!(a.sort_cmp(&c), Ordering::Equal);
        assert_eq!(a.sort_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn test_find_duplicate_gtu() {
        let mut db = Database::new(vec![
            Entry::new("g", "t", "u"),
            Entry::new("g", "t", "v"),
        ]);
        assert_eq!(db.find_duplicate_gtu(), None);

        db.entries.push(Entry::new("g", "t", "u"));
        assert_eq!(db.find_duplicate_gtu(), Some(GtuKey::new("g", "t", "u")));
    }

    #[test]
    fn test_entry_deserializes_with_defaults() {
        let json = r#"{"uuid": "6f1c3f5e-2b1a-4c1e-9a57-3f0c8a2d4b11", "title": "Visa"}"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.title, "Visa");
        assert_eq!(entry.entry_type, EntryType::Normal);
        assert_eq!(entry.status, EntryStatus::Clean);
        assert!(entry.policy.is_none());
    }
}
