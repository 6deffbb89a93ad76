//! Per-field equality and copying shared by compare and synchronize.

use chrono::{DateTime, Utc};

use crate::entry::Entry;
use crate::field_registry::FieldType;

fn text_of(entry: &Entry, field: FieldType) -> Option<&String> {
    let text = match field {
        FieldType::Group => &entry.group,
        FieldType::Title => &entry.title,
        FieldType::User => &entry.user,
        FieldType::Notes => &entry.notes,
        FieldType::Password => &entry.password,
        FieldType::Url => &entry.url,
        FieldType::Autotype => &entry.autotype,
        FieldType::RunCommand => &entry.run_command,
        FieldType::Email => &entry.email,
        FieldType::Symbols => &entry.symbols,
        FieldType::PolicyName => &entry.policy_name,
        FieldType::KbShortcut => &entry.kb_shortcut,
        _ => return None,
    };
    Some(text)
}

fn text_mut(entry: &mut Entry, field: FieldType) -> Option<&mut String> {
    let text = match field {
        FieldType::Notes => &mut entry.notes,
        FieldType::Password => &mut entry.password,
        FieldType::Url => &mut entry.url,
        FieldType::Autotype => &mut entry.autotype,
        FieldType::RunCommand => &mut entry.run_command,
        FieldType::Email => &mut entry.email,
        FieldType::Symbols => &mut entry.symbols,
        FieldType::PolicyName => &mut entry.policy_name,
        FieldType::KbShortcut => &mut entry.kb_shortcut,
        _ => return None,
    };
    Some(text)
}

/// Free-text fields where whitespace-only content counts as empty.
fn blank_is_empty(field: FieldType) -> bool {
    matches!(field, FieldType::Notes | FieldType::Url | FieldType::Autotype)
}

fn canonical(text: &str, whitespace_as_empty: bool) -> &str {
    if whitespace_as_empty && text.trim().is_empty() {
        ""
    } else {
        text
    }
}

/// Stored times carry whole seconds; sub-second noise from imports is ignored.
fn same_second(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    a.map(|t| t.timestamp()) == b.map(|t| t.timestamp())
}

/// Zero and unset intervals both mean "no recurring expiry".
fn interval(entry: &Entry) -> Option<u32> {
    entry.expiry_interval.filter(|d| *d > 0)
}

/// Whether `field` holds the same value in both entries.
///
/// `whitespace_as_empty` only affects notes, URL and autotype; every other
/// text field, the password included, compares exactly. Fields that are not
/// comparable always compare equal.
pub(crate) fn field_equal(
    a: &Entry,
    b: &Entry,
    field: FieldType,
    whitespace_as_empty: bool,
) -> bool {
    if let (Some(x), Some(y)) = (text_of(a, field), text_of(b, field)) {
        let blank = whitespace_as_empty && blank_is_empty(field);
        return canonical(x, blank) == canonical(y, blank);
    }
    match field {
        FieldType::Created => same_second(a.created, b.created),
        FieldType::PasswordModified => same_second(a.password_modified, b.password_modified),
        FieldType::LastAccessed => same_second(a.last_accessed, b.last_accessed),
        FieldType::Expiry => same_second(a.password_expiry, b.password_expiry),
        FieldType::RecordModified => same_second(a.record_modified, b.record_modified),
        FieldType::ExpiryInterval => interval(a) == interval(b),
        FieldType::PasswordHistory => a.history == b.history,
        FieldType::Policy => a.policy == b.policy,
        FieldType::Attachment => a.attachment == b.attachment,
        FieldType::Dca => a.dca == b.dca,
        FieldType::ShiftDca => a.shift_dca == b.shift_dca,
        FieldType::Protected => a.protected == b.protected,
        _ => true,
    }
}

/// Copy one copyable field from `source` into `target`.
///
/// Identity fields and derived values are left alone.
pub(crate) fn copy_field(target: &mut Entry, source: &Entry, field: FieldType) {
    if !field.is_copyable() {
        return;
    }
    if let (Some(dst), Some(src)) = (text_mut(target, field), text_of(source, field)) {
        dst.clone_from(src);
        return;
    }
    match field {
        FieldType::Created => target.created = source.created,
        FieldType::PasswordModified => target.password_modified = source.password_modified,
        FieldType::LastAccessed => target.last_accessed = source.last_accessed,
        FieldType::Expiry => target.password_expiry = source.password_expiry,
        FieldType::RecordModified => target.record_modified = source.record_modified,
        FieldType::ExpiryInterval => target.expiry_interval = source.expiry_interval,
        FieldType::PasswordHistory => target.history.clone_from(&source.history),
        FieldType::Policy => target.policy.clone_from(&source.policy),
        FieldType::Attachment => target.attachment.clone_from(&source.attachment),
        FieldType::Dca => target.dca = source.dca,
        FieldType::ShiftDca => target.shift_dca = source.shift_dca,
        FieldType::Protected => target.protected = source.protected,
        _ => {}
    }
}
