//! Field registry: every filterable and comparable field, its match type,
//! the rules it accepts and the default field masks per context.
//!
//! All lookups are total `match`es over [`FieldType`], so adding a field
//! forces every table here to be updated.

mod mask;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreResult;
use crate::filter::Rule;

pub use mask::FieldMask;

/// Every field a filter row or a compare/synchronize mask can name.
///
/// Serialized names are the persisted filter field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldType {
    // Main entry fields
    #[serde(rename = "grouptitle")]
    GroupTitle = 0,
    #[serde(rename = "group")]
    Group = 1,
    #[serde(rename = "title")]
    Title = 2,
    #[serde(rename = "user")]
    User = 3,
    #[serde(rename = "notes")]
    Notes = 4,
    #[serde(rename = "password")]
    Password = 5,
    #[serde(rename = "create_time")]
    Created = 6,
    #[serde(rename = "password_modified_time")]
    PasswordModified = 7,
    #[serde(rename = "last_access_time")]
    LastAccessed = 8,
    #[serde(rename = "expiry_time")]
    Expiry = 9,
    #[serde(rename = "record_modified_time")]
    RecordModified = 10,
    #[serde(rename = "url")]
    Url = 11,
    #[serde(rename = "autotype")]
    Autotype = 12,
    #[serde(rename = "password_history")]
    PasswordHistory = 13,
    #[serde(rename = "password_policy")]
    Policy = 14,
    #[serde(rename = "password_expiry_interval")]
    ExpiryInterval = 15,
    #[serde(rename = "runcommand")]
    RunCommand = 16,
    #[serde(rename = "DCA")]
    Dca = 17,
    #[serde(rename = "ShiftDCA")]
    ShiftDca = 18,
    #[serde(rename = "email")]
    Email = 19,
    #[serde(rename = "protected")]
    Protected = 20,
    #[serde(rename = "symbols")]
    Symbols = 21,
    #[serde(rename = "policy_name")]
    PolicyName = 22,
    #[serde(rename = "kbshortcut")]
    KbShortcut = 23,
    #[serde(rename = "entrysize")]
    EntrySize = 24,
    #[serde(rename = "entrytype")]
    EntryType = 25,
    #[serde(rename = "entrystatus")]
    EntryStatus = 26,
    #[serde(rename = "unknownfields")]
    UnknownFields = 27,
    #[serde(rename = "password_length")]
    PasswordLength = 28,
    #[serde(rename = "attachment")]
    Attachment = 29,

    // Password history sub-filter
    #[serde(rename = "history_present")]
    HistoryPresent = 30,
    #[serde(rename = "history_active")]
    HistoryActive = 31,
    #[serde(rename = "history_number")]
    HistoryCount = 32,
    #[serde(rename = "history_maximum")]
    HistoryMax = 33,
    #[serde(rename = "history_changedate")]
    HistoryChangeDate = 34,
    #[serde(rename = "history_passwords")]
    HistoryPasswords = 35,

    // Password policy sub-filter
    #[serde(rename = "policy_present")]
    PolicyPresent = 36,
    #[serde(rename = "policy_length")]
    PolicyLength = 37,
    #[serde(rename = "policy_number_lowercase")]
    PolicyLowercase = 38,
    #[serde(rename = "policy_number_uppercase")]
    PolicyUppercase = 39,
    #[serde(rename = "policy_number_digits")]
    PolicyDigits = 40,
    #[serde(rename = "policy_number_symbols")]
    PolicySymbols = 41,
    #[serde(rename = "policy_easyvision")]
    PolicyEasyVision = 42,
    #[serde(rename = "policy_pronounceable")]
    PolicyPronounceable = 43,
    #[serde(rename = "policy_hexadecimal")]
    PolicyHexadecimal = 44,

    // Attachment sub-filter
    #[serde(rename = "attachment_present")]
    AttachmentPresent = 45,
    #[serde(rename = "attachment_title")]
    AttachmentTitle = 46,
    #[serde(rename = "attachment_ctime")]
    AttachmentCreated = 47,
    #[serde(rename = "attachment_mediatype")]
    AttachmentMediaType = 48,
    #[serde(rename = "attachment_filename")]
    AttachmentFilename = 49,
    #[serde(rename = "attachment_filepath")]
    AttachmentPath = 50,
    #[serde(rename = "attachment_filectime")]
    AttachmentFileCreated = 51,
    #[serde(rename = "attachment_filemtime")]
    AttachmentFileModified = 52,
    #[serde(rename = "attachment_fileatime")]
    AttachmentFileAccessed = 53,
}

/// How a field's value is interpreted when matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    String,
    Password,
    Integer,
    Date,
    Bool,
    EntryType,
    EntryStatus,
    EntrySize,
    Dca,
    ShiftDca,
    PasswordHistory,
    PasswordPolicy,
    Attachment,
    MediaType,
}

impl MatchType {
    /// The criteria list a nested match type delegates to.
    pub fn nested_scope(self) -> Option<FilterScope> {
        match self {
            MatchType::PasswordHistory => Some(FilterScope::History),
            MatchType::PasswordPolicy => Some(FilterScope::Policy),
            MatchType::Attachment => Some(FilterScope::Attachment),
            _ => None,
        }
    }
}

/// Which criteria list a field may appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterScope {
    Main,
    History,
    Policy,
    Attachment,
}

impl fmt::Display for FilterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterScope::Main => "main",
            FilterScope::History => "password history",
            FilterScope::Policy => "password policy",
            FilterScope::Attachment => "attachment",
        };
        f.write_str(s)
    }
}

/// Where a default field mask is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskContext {
    Compare,
    Synchronize,
    Export,
    Filter,
}

/// Units for entry-size operands; values are compared in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnit {
    #[default]
    Bytes,
    Kilobytes,
    Megabytes,
}

impl SizeUnit {
    pub fn shift(self) -> u32 {
        match self {
            SizeUnit::Bytes => 0,
            SizeUnit::Kilobytes => 10,
            SizeUnit::Megabytes => 20,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            SizeUnit::Bytes => "B",
            SizeUnit::Kilobytes => "KB",
            SizeUnit::Megabytes => "MB",
        }
    }
}

const STRING_RULES: &[Rule] = &[
    Rule::Equals,
    Rule::NotEqual,
    Rule::Begins,
    Rule::NotBegins,
    Rule::Ends,
    Rule::NotEnds,
    Rule::Contains,
    Rule::NotContains,
    Rule::ContainsAny,
    Rule::ContainsNone,
    Rule::ContainsAll,
    Rule::NotContainsAll,
];

const OPTIONAL_STRING_RULES: &[Rule] = &[
    Rule::Equals,
    Rule::NotEqual,
    Rule::Begins,
    Rule::NotBegins,
    Rule::Ends,
    Rule::NotEnds,
    Rule::Contains,
    Rule::NotContains,
    Rule::ContainsAny,
    Rule::ContainsNone,
    Rule::ContainsAll,
    Rule::NotContainsAll,
    Rule::Present,
    Rule::NotPresent,
];

const PASSWORD_RULES: &[Rule] = &[
    Rule::Equals,
    Rule::NotEqual,
    Rule::Begins,
    Rule::NotBegins,
    Rule::Ends,
    Rule::NotEnds,
    Rule::Contains,
    Rule::NotContains,
    Rule::ContainsAny,
    Rule::ContainsNone,
    Rule::ContainsAll,
    Rule::NotContainsAll,
    Rule::Expired,
    Rule::WillExpire,
];

const INTEGER_RULES: &[Rule] = &[
    Rule::Equals,
    Rule::NotEqual,
    Rule::Less,
    Rule::LessEqual,
    Rule::Greater,
    Rule::GreaterEqual,
    Rule::Between,
];

const OPTIONAL_INTEGER_RULES: &[Rule] = &[
    Rule::Equals,
    Rule::NotEqual,
    Rule::Less,
    Rule::LessEqual,
    Rule::Greater,
    Rule::GreaterEqual,
    Rule::Between,
    Rule::Present,
    Rule::NotPresent,
];

const DATE_RULES: &[Rule] = &[
    Rule::Equals,
    Rule::NotEqual,
    Rule::Before,
    Rule::After,
    Rule::Less,
    Rule::LessEqual,
    Rule::Greater,
    Rule::GreaterEqual,
    Rule::Between,
    Rule::Present,
    Rule::NotPresent,
];

const BOOL_RULES: &[Rule] = &[
    Rule::Is,
    Rule::IsNot,
    Rule::Present,
    Rule::NotPresent,
    Rule::Active,
    Rule::Inactive,
    Rule::Set,
    Rule::NotSet,
];

const IS_RULES: &[Rule] = &[Rule::Is, Rule::IsNot];

impl FieldType {
    /// Every field, in discriminant order.
    pub const ALL: [FieldType; 54] = [
        FieldType::GroupTitle,
        FieldType::Group,
        FieldType::Title,
        FieldType::User,
        FieldType::Notes,
        FieldType::Password,
        FieldType::Created,
        FieldType::PasswordModified,
        FieldType::LastAccessed,
        FieldType::Expiry,
        FieldType::RecordModified,
        FieldType::Url,
        FieldType::Autotype,
        FieldType::PasswordHistory,
        FieldType::Policy,
        FieldType::ExpiryInterval,
        FieldType::RunCommand,
        FieldType::Dca,
        FieldType::ShiftDca,
        FieldType::Email,
        FieldType::Protected,
        FieldType::Symbols,
        FieldType::PolicyName,
        FieldType::KbShortcut,
        FieldType::EntrySize,
        FieldType::EntryType,
        FieldType::EntryStatus,
        FieldType::UnknownFields,
        FieldType::PasswordLength,
        FieldType::Attachment,
        FieldType::HistoryPresent,
        FieldType::HistoryActive,
        FieldType::HistoryCount,
        FieldType::HistoryMax,
        FieldType::HistoryChangeDate,
        FieldType::HistoryPasswords,
        FieldType::PolicyPresent,
        FieldType::PolicyLength,
        FieldType::PolicyLowercase,
        FieldType::PolicyUppercase,
        FieldType::PolicyDigits,
        FieldType::PolicySymbols,
        FieldType::PolicyEasyVision,
        FieldType::PolicyPronounceable,
        FieldType::PolicyHexadecimal,
        FieldType::AttachmentPresent,
        FieldType::AttachmentTitle,
        FieldType::AttachmentCreated,
        FieldType::AttachmentMediaType,
        FieldType::AttachmentFilename,
        FieldType::AttachmentPath,
        FieldType::AttachmentFileCreated,
        FieldType::AttachmentFileModified,
        FieldType::AttachmentFileAccessed,
    ];

    pub fn match_type(self) -> MatchType {
        match_type_of(self)
    }

    pub fn scope(self) -> FilterScope {
        match self as u8 {
            0..=29 => FilterScope::Main,
            30..=35 => FilterScope::History,
            36..=44 => FilterScope::Policy,
            _ => FilterScope::Attachment,
        }
    }

    /// Fields that always hold a value and so reject present/not-present.
    pub fn is_always_present(self) -> bool {
        matches!(
            self,
            FieldType::GroupTitle | FieldType::Group | FieldType::Title | FieldType::Password
        )
    }

    /// The group/title/user identity fields.
    pub fn is_identity(self) -> bool {
        matches!(
            self,
            FieldType::GroupTitle | FieldType::Group | FieldType::Title | FieldType::User
        )
    }

    /// Entry time fields (including the expiry interval).
    pub fn is_time(self) -> bool {
        matches!(
            self,
            FieldType::Created
                | FieldType::PasswordModified
                | FieldType::LastAccessed
                | FieldType::Expiry
                | FieldType::RecordModified
                | FieldType::ExpiryInterval
        )
    }

    /// Stored entry fields that compare can diff.
    ///
    /// Derived values (size, password length, type, status, unknown fields)
    /// and nested sub-filter fields are not comparable.
    pub fn is_comparable(self) -> bool {
        match self {
            FieldType::Group
            | FieldType::Title
            | FieldType::User
            | FieldType::Notes
            | FieldType::Password
            | FieldType::Created
            | FieldType::PasswordModified
            | FieldType::LastAccessed
            | FieldType::Expiry
            | FieldType::RecordModified
            | FieldType::Url
            | FieldType::Autotype
            | FieldType::PasswordHistory
            | FieldType::Policy
            | FieldType::ExpiryInterval
            | FieldType::RunCommand
            | FieldType::Dca
            | FieldType::ShiftDca
            | FieldType::Email
            | FieldType::Protected
            | FieldType::Symbols
            | FieldType::PolicyName
            | FieldType::KbShortcut
            | FieldType::Attachment => true,
            _ => false,
        }
    }

    /// Fields synchronize may copy: comparable, but never identity.
    pub fn is_copyable(self) -> bool {
        self.is_comparable() && !self.is_identity()
    }

    /// Declared operand range for integer and size fields.
    pub fn integer_bounds(self) -> Option<(i64, i64)> {
        let max_int = i64::from(i32::MAX);
        match self {
            FieldType::PasswordLength | FieldType::PolicyLength => Some((4, 1024)),
            FieldType::ExpiryInterval => Some((1, 3650)),
            FieldType::HistoryCount => Some((0, max_int)),
            FieldType::HistoryMax => Some((0, 255)),
            FieldType::PolicyLowercase
            | FieldType::PolicyUppercase
            | FieldType::PolicyDigits
            | FieldType::PolicySymbols => Some((0, 1024)),
            FieldType::EntrySize => Some((0, max_int)),
            _ => None,
        }
    }

    /// Persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::GroupTitle => "grouptitle",
            FieldType::Group => "group",
            FieldType::Title => "title",
            FieldType::User => "user",
            FieldType::Notes => "notes",
            FieldType::Password => "password",
            FieldType::Created => "create_time",
            FieldType::PasswordModified => "password_modified_time",
            FieldType::LastAccessed => "last_access_time",
            FieldType::Expiry => "expiry_time",
            FieldType::RecordModified => "record_modified_time",
            FieldType::Url => "url",
            FieldType::Autotype => "autotype",
            FieldType::PasswordHistory => "password_history",
            FieldType::Policy => "password_policy",
            FieldType::ExpiryInterval => "password_expiry_interval",
            FieldType::RunCommand => "runcommand",
            FieldType::Dca => "DCA",
            FieldType::ShiftDca => "ShiftDCA",
            FieldType::Email => "email",
            FieldType::Protected => "protected",
            FieldType::Symbols => "symbols",
            FieldType::PolicyName => "policy_name",
            FieldType::KbShortcut => "kbshortcut",
            FieldType::EntrySize => "entrysize",
            FieldType::EntryType => "entrytype",
            FieldType::EntryStatus => "entrystatus",
            FieldType::UnknownFields => "unknownfields",
            FieldType::PasswordLength => "password_length",
            FieldType::Attachment => "attachment",
            FieldType::HistoryPresent => "history_present",
            FieldType::HistoryActive => "history_active",
            FieldType::HistoryCount => "history_number",
            FieldType::HistoryMax => "history_maximum",
            FieldType::HistoryChangeDate => "history_changedate",
            FieldType::HistoryPasswords => "history_passwords",
            FieldType::PolicyPresent => "policy_present",
            FieldType::PolicyLength => "policy_length",
            FieldType::PolicyLowercase => "policy_number_lowercase",
            FieldType::PolicyUppercase => "policy_number_uppercase",
            FieldType::PolicyDigits => "policy_number_digits",
            FieldType::PolicySymbols => "policy_number_symbols",
            FieldType::PolicyEasyVision => "policy_easyvision",
            FieldType::PolicyPronounceable => "policy_pronounceable",
            FieldType::PolicyHexadecimal => "policy_hexadecimal",
            FieldType::AttachmentPresent => "attachment_present",
            FieldType::AttachmentTitle => "attachment_title",
            FieldType::AttachmentCreated => "attachment_ctime",
            FieldType::AttachmentMediaType => "attachment_mediatype",
            FieldType::AttachmentFilename => "attachment_filename",
            FieldType::AttachmentPath => "attachment_filepath",
            FieldType::AttachmentFileCreated => "attachment_filectime",
            FieldType::AttachmentFileModified => "attachment_filemtime",
            FieldType::AttachmentFileAccessed => "attachment_fileatime",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The semantic type of a field.
pub fn match_type_of(field: FieldType) -> MatchType {
    use FieldType as F;
    match field {
        F::GroupTitle
        | F::Group
        | F::Title
        | F::User
        | F::Notes
        | F::Url
        | F::Autotype
        | F::RunCommand
        | F::Email
        | F::Symbols
        | F::PolicyName
        | F::KbShortcut
        | F::HistoryPasswords
        | F::AttachmentTitle
        | F::AttachmentFilename
        | F::AttachmentPath => MatchType::String,
        F::Password => MatchType::Password,
        F::Created
        | F::PasswordModified
        | F::LastAccessed
        | F::Expiry
        | F::RecordModified
        | F::HistoryChangeDate
        | F::AttachmentCreated
        | F::AttachmentFileCreated
        | F::AttachmentFileModified
        | F::AttachmentFileAccessed => MatchType::Date,
        F::ExpiryInterval
        | F::PasswordLength
        | F::HistoryCount
        | F::HistoryMax
        | F::PolicyLength
        | F::PolicyLowercase
        | F::PolicyUppercase
        | F::PolicyDigits
        | F::PolicySymbols => MatchType::Integer,
        F::Protected
        | F::UnknownFields
        | F::HistoryPresent
        | F::HistoryActive
        | F::PolicyPresent
        | F::PolicyEasyVision
        | F::PolicyPronounceable
        | F::PolicyHexadecimal
        | F::AttachmentPresent => MatchType::Bool,
        F::PasswordHistory => MatchType::PasswordHistory,
        F::Policy => MatchType::PasswordPolicy,
        F::Attachment => MatchType::Attachment,
        F::Dca => MatchType::Dca,
        F::ShiftDca => MatchType::ShiftDca,
        F::EntrySize => MatchType::EntrySize,
        F::EntryType => MatchType::EntryType,
        F::EntryStatus => MatchType::EntryStatus,
        F::AttachmentMediaType => MatchType::MediaType,
    }
}

/// Rules a row on `field` may use. Nested rows take no rule at all.
pub fn permitted_rules(field: FieldType) -> &'static [Rule] {
    match match_type_of(field) {
        MatchType::String if field.is_always_present() => STRING_RULES,
        MatchType::String | MatchType::MediaType => OPTIONAL_STRING_RULES,
        MatchType::Password => PASSWORD_RULES,
        MatchType::Integer if field == FieldType::ExpiryInterval => OPTIONAL_INTEGER_RULES,
        MatchType::Integer | MatchType::EntrySize => INTEGER_RULES,
        MatchType::Date => DATE_RULES,
        MatchType::Bool => BOOL_RULES,
        MatchType::EntryType | MatchType::EntryStatus | MatchType::Dca | MatchType::ShiftDca => {
            IS_RULES
        }
        MatchType::PasswordHistory | MatchType::PasswordPolicy | MatchType::Attachment => &[],
    }
}

pub fn rule_permitted(field: FieldType, rule: Rule) -> bool {
    permitted_rules(field).contains(&rule)
}

/// Default field selection for a context.
pub fn default_field_mask(context: MaskContext) -> FieldMask {
    let pick = |keep: fn(FieldType) -> bool| {
        FieldType::ALL
            .iter()
            .copied()
            .filter(|f| keep(*f))
            .collect::<FieldMask>()
    };
    match context {
        MaskContext::Compare => pick(|f| f.is_comparable() && !f.is_identity() && !f.is_time()),
        MaskContext::Synchronize => pick(|f| f.is_copyable() && !f.is_time()),
        MaskContext::Export => pick(FieldType::is_comparable),
        MaskContext::Filter => FieldMask::all_of(FilterScope::Main),
    }
}

/// Input for looking up a default field mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMaskInput {
    pub context: MaskContext,
}

/// Look up a default field mask from a JSON string input.
/// Returns the JSON list of field names. Convenience function for FFI.
pub fn default_field_mask_json(input_json: &str) -> CoreResult<String> {
    let input: FieldMaskInput = serde_json::from_str(input_json)?;
    Ok(serde_json::to_string(&default_field_mask(input.context))?)
}
